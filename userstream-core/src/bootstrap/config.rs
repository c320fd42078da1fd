//! Configuration loading

use anyhow::Result;
use std::path::Path;

use crate::Config;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "USERSTREAM_CONFIG_PATH";

/// Config file looked for in the working directory
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Load and validate configuration.
///
/// Uses the file named by `USERSTREAM_CONFIG_PATH`, else `./config.yaml`,
/// else environment variables and defaults only. Runs before logging is
/// set up, so progress goes to stderr.
pub fn load_config() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let config = match resolve_config_path(explicit.as_deref()) {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path)?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    validated(config)
}

/// Pick the config file to read, if any exists
fn resolve_config_path(explicit: Option<&str>) -> Option<String> {
    explicit
        .filter(|p| Path::new(p).exists())
        .map(str::to_string)
        .or_else(|| {
            Path::new(DEFAULT_CONFIG_FILE)
                .exists()
                .then(|| DEFAULT_CONFIG_FILE.to_string())
        })
}

fn validated(config: Config) -> Result<Config> {
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }
    Ok(config)
}
