//! Tunables for the resolver, loadable from an optional TOML/JSON file
//! the caller supplies. There is no implicit environment or CLI surface.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolver tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// The score given to the unconditional condition set, so that it
    /// always loses to any positively-matched conditional set but beats
    /// fully-mismatched alternatives.
    pub unconditional_floor: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            unconditional_floor: 0.5,
        }
    }
}

impl ResolverConfig {
    /// Loads config from `path`, dispatching on its extension (`.toml` or
    /// `.json`; anything else is read as JSON).
    pub fn from_file(path: &Path) -> Result<Self> {
        load_config_file(path)
    }
}

/// Reads and deserializes `path` as TOML or JSON, picked by extension.
/// Shared by every crate in this workspace that exposes a file-loadable
/// config struct.
pub fn load_config_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfigFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text).map_err(|e| Error::InvalidConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
        _ => serde_json::from_str(&text).map_err(|e| Error::InvalidConfigFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.toml");
        std::fs::write(&path, "unconditional_floor = 0.25\n").unwrap();
        let config = ResolverConfig::from_file(&path).unwrap();
        assert_eq!(config.unconditional_floor, 0.25);
    }

    #[test]
    fn loads_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        std::fs::write(&path, r#"{"unconditional_floor": 0.75}"#).unwrap();
        let config = ResolverConfig::from_file(&path).unwrap();
        assert_eq!(config.unconditional_floor, 0.75);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ResolverConfig::from_file(Path::new("/nonexistent/resolver.toml")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigFile { .. }));
    }
}
