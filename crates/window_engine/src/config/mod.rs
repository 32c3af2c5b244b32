//! Configuration system
//!
//! Runtime-wide settings and the file loading shared by every serializable
//! settings type (`RuntimeConfig`, `WindowOptions`).

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, picking the format from the file name
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Default gap between two primary clicks that still counts as a double click
pub const DEFAULT_DOUBLE_CLICK_MS: f64 = 500.0;

/// Process-wide runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum gap in milliseconds between two clicks forming a `dblclick`
    pub double_click_threshold_ms: f64,

    /// Mirror every mouse down/up/move as a pointer event
    pub pointer_events: bool,

    /// Exit the process with code 0 once the main loop has torn down
    pub exit_process: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            double_click_threshold_ms: DEFAULT_DOUBLE_CLICK_MS,
            pointer_events: true,
            exit_process: true,
        }
    }
}

impl RuntimeConfig {
    /// Settings suitable for in-process use: the loop returns instead of exiting
    pub fn embedded() -> Self {
        Self {
            exit_process: false,
            ..Self::default()
        }
    }
}

impl Config for RuntimeConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RuntimeConfig::from_str_with_format("pointer_events = false", "runtime.toml")
            .unwrap();

        assert!(!config.pointer_events);
        assert_eq!(config.double_click_threshold_ms, DEFAULT_DOUBLE_CLICK_MS);
        assert!(config.exit_process);
    }

    #[test]
    fn test_ron_parse() {
        let config = RuntimeConfig::from_str_with_format(
            "(double_click_threshold_ms: 250.0, exit_process: false)",
            "runtime.ron",
        )
        .unwrap();

        assert_eq!(config.double_click_threshold_ms, 250.0);
        assert!(!config.exit_process);
        assert!(config.pointer_events);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = RuntimeConfig::from_str_with_format("{}", "runtime.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let file = format!("window_engine_cfg_{}.toml", std::process::id());
        let path = std::env::temp_dir().join(file);
        let path = path.to_string_lossy().to_string();

        let config = RuntimeConfig {
            double_click_threshold_ms: 320.0,
            ..RuntimeConfig::embedded()
        };
        config.save_to_file(&path).unwrap();
        let loaded = RuntimeConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
