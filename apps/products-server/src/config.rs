//! Application configuration.
//!
//! Layering, lowest first: defaults -> YAML (`--config`) ->
//! `PRODUCTS__SECTION__KEY` environment variables -> CLI overrides.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use products::ProductsConfig;
use serde::{Deserialize, Serialize};
use svckit::bootstrap::{LoggingConfig, load_layered, to_yaml};
use svckit::telemetry::TracingConfig;

pub const ENV_PREFIX: &str = "PRODUCTS__";

/// Hosting environment; decides the default for error diagnostics.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Environment {
    Development,
    Local,
    Staging,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::Local => "Local",
            Self::Staging => "Staging",
            Self::Production => "Production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// How long in-flight requests may keep running after a shutdown signal
    /// before their service calls are cancelled.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            environment: Environment::default(),
            shutdown_grace_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub dsn: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://products.db?mode=rwc".to_owned(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Include exception details in 500 responses. Unset means "on outside
    /// production-like environments".
    pub diagnostics: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    /// Resident memory above this reports the service as degraded.
    pub memory_threshold_bytes: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            memory_threshold_bytes: 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub tracing: TracingConfig,
    pub errors: ErrorsConfig,
    pub health: HealthConfig,
    pub products: ProductsConfig,
    /// Message overrides, keyed by error code.
    pub resources: BTreeMap<String, String>,
}

/// Overrides taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub environment: Option<Environment>,
    pub verbose: u8,
}

impl AppConfig {
    /// # Errors
    /// Returns an error if the file is missing or any layer is invalid.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Ok(load_layered(path, ENV_PREFIX)?)
    }

    pub fn apply_cli_overrides(&mut self, cli: CliOverrides) {
        if let Some(port) = cli.port {
            self.server.bind_addr.set_port(port);
        }
        if let Some(env) = cli.environment {
            self.server.environment = env;
        }
        match cli.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }
    }

    #[must_use]
    pub fn diagnostics_enabled(&self) -> bool {
        self.errors.diagnostics.unwrap_or(matches!(
            self.server.environment,
            Environment::Development | Environment::Local | Environment::Staging
        ))
    }

    /// # Errors
    /// Returns an error if the configuration cannot be rendered.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(to_yaml(self)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_production_without_diagnostics() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.environment, Environment::Production);
        assert!(!cfg.diagnostics_enabled());
        assert_eq!(cfg.products.max_name_len, 100);
        assert_eq!(cfg.health.memory_threshold_bytes, 1 << 30);
        assert_eq!(cfg.server.shutdown_grace(), Duration::from_secs(10));
    }

    #[test]
    fn diagnostics_follow_environment_unless_set() {
        let mut cfg = AppConfig::default();
        for env in [Environment::Development, Environment::Local, Environment::Staging] {
            cfg.server.environment = env;
            assert!(cfg.diagnostics_enabled(), "{env:?}");
        }

        cfg.errors.diagnostics = Some(false);
        assert!(!cfg.diagnostics_enabled());

        cfg.server.environment = Environment::Production;
        cfg.errors.diagnostics = Some(true);
        assert!(cfg.diagnostics_enabled());
    }

    #[test]
    fn yaml_then_env_then_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "server:\n  bind_addr: \"0.0.0.0:9000\"\n  environment: Staging\n\
             products:\n  max_name_len: 20\n\
             resources:\n  Name_Required: \"Please name it\"\n"
        )
        .unwrap();

        let mut cfg = temp_env::with_var("PRODUCTS__PRODUCTS__MAX_NAME_LEN", Some("30"), || {
            AppConfig::load(Some(file.path())).unwrap()
        });
        assert_eq!(cfg.server.bind_addr.port(), 9000);
        assert_eq!(cfg.server.environment, Environment::Staging);
        assert_eq!(cfg.products.max_name_len, 30);
        assert_eq!(cfg.resources["Name_Required"], "Please name it");

        cfg.apply_cli_overrides(CliOverrides {
            port: Some(9100),
            environment: Some(Environment::Production),
            verbose: 2,
        });
        assert_eq!(cfg.server.bind_addr.to_string(), "0.0.0.0:9100");
        assert_eq!(cfg.server.environment, Environment::Production);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "server:\n  bind_adress: \"0.0.0.0:9000\"\n").unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn renders_yaml() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("bind_addr"));
        assert!(yaml.contains("max_name_len"));
    }
}
