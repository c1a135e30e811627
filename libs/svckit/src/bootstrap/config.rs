//! Layered configuration loading.
//!
//! Precedence, lowest first: `T::default()` -> YAML file -> environment
//! variables with the given prefix (`PREFIX__SECTION__KEY`). CLI overrides
//! are applied by the binary on the extracted value.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
    #[error("failed to render configuration: {0}")]
    Render(String),
}

/// Build the layered figment for `T`.
pub fn figment_for<T>(path: Option<&Path>, env_prefix: &str) -> Result<Figment, ConfigError>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        figment = figment.merge(Yaml::file_exact(path));
    }

    Ok(figment.merge(Env::prefixed(env_prefix).split("__")))
}

/// Load `T` from defaults, an optional YAML file and the environment.
///
/// # Errors
/// Returns an error if the file is missing or a layer doesn't match `T`.
pub fn load_layered<T>(path: Option<&Path>, env_prefix: &str) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned + Default,
{
    figment_for::<T>(path, env_prefix)?
        .extract()
        .map_err(|e| ConfigError::Invalid(Box::new(e)))
}

/// YAML rendering of an effective configuration.
///
/// # Errors
/// Returns an error if `value` cannot be serialized.
pub fn to_yaml<T: Serialize>(value: &T) -> Result<String, ConfigError> {
    serde_saphyr::to_string(value).map_err(|e| ConfigError::Render(e.to_string()))
}
