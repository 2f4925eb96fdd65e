use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_logging;
pub use settings::{
    LedgerConfig, LoaderSettings, LogSettings, StoreBackend, StoreSettings, WorkloadSettings,
};

/// The file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

/// Loads the application configuration.
///
/// Sources are layered: built-in defaults, then the TOML file at `path` (or
/// `ledger.toml` when `path` is `None`, which may be absent), then environment
/// variables such as `LEDGER__STORE__BACKEND=postgres`. The result is validated
/// before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<LedgerConfig, ConfigError> {
    let file = match path {
        // An explicitly requested file must exist.
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("LEDGER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<LedgerConfig>()?;
    config.validate()?;

    Ok(config)
}
