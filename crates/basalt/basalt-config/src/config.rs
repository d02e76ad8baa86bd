use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BasaltConfig {
    /// Prefix for the channel's kernel object names; supervisor and
    /// generators must use the same value.
    #[serde(default = "defaults::channel_name")]
    pub channel_name: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn channel_name() -> String {
        "basalt-3color".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for BasaltConfig {
    fn default() -> Self {
        Self {
            channel_name: defaults::channel_name(),
            log_level: defaults::log_level(),
        }
    }
}

impl BasaltConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: BasaltConfig = toml::from_str(&toml_to_str)?;
        Ok(config)
    }
}
