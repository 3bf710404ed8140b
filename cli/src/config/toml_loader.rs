//! TOML configuration file loading.
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Load and deserialize a TOML file.
///
/// A missing file deserializes from empty TOML, so every section falls back
/// to its `#[serde(default)]`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read and
/// [`ConfigError::Parse`] if it is not valid for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return toml::from_str("").map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Default config file location: `$XDG_CONFIG_HOME/envkit/config.toml`,
/// falling back to `~/.config/envkit/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|dir| !dir.is_empty())
        .map_or_else(
            || {
                std::env::var("HOME")
                    .or_else(|_| std::env::var("USERPROFILE"))
                    .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                    .join(".config")
            },
            PathBuf::from,
        )
        .join("envkit")
        .join("config.toml")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        items: HashMap<String, Vec<String>>,
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let sample: Sample = load_config(&dir.path().join("absent.toml")).unwrap();
        assert!(sample.name.is_empty());
        assert!(sample.items.is_empty());
    }

    #[test]
    fn parses_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "name = \"x\"\n[items]\na = [\"1\", \"2\"]\n").unwrap();
        let sample: Sample = load_config(&path).unwrap();
        assert_eq!(sample.name, "x");
        assert_eq!(sample.items["a"], ["1", "2"]);
    }

    #[test]
    fn syntax_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "name = \n").unwrap();
        let err = load_config::<Sample>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"), "{err}");
    }

    #[test]
    fn default_path_ends_with_envkit_config() {
        let path = default_config_path();
        assert!(path.ends_with("envkit/config.toml"), "{}", path.display());
    }
}
