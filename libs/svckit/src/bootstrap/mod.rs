pub mod config;
pub mod logging;
pub mod signals;

pub use config::{ConfigError, load_layered, to_yaml};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use signals::{cancel_on_signal, wait_for_shutdown};
