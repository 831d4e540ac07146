//! Optional TOML configuration file
//!
//! ```toml
//! [cmdb]
//! read_endpoint = "https://cmdb.example.org/cmdb/v1"
//! write_endpoint = "https://couch.example.org/cmdb"
//! timeout_secs = 60
//!
//! [auth]
//! user = "admin"
//! password = "secret"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub cmdb: CmdbSection,
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmdbSection {
    pub read_endpoint: Option<String>,
    pub write_endpoint: Option<String>,
    pub data_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    pub oidc_token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// `~/.config/bulksend2cmdb/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bulksend2cmdb").join("config.toml"))
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration file")
    }

    /// Load an explicitly requested file (must exist), or the default file
    /// when present, or nothing
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            [cmdb]
            read_endpoint = "https://cmdb.example.org/cmdb/v1"
            write_endpoint = "https://couch.example.org/cmdb"
            timeout_secs = 10

            [auth]
            oidc_token = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.cmdb.read_endpoint.as_deref(),
            Some("https://cmdb.example.org/cmdb/v1")
        );
        assert_eq!(config.cmdb.timeout_secs, Some(10));
        assert_eq!(config.auth.oidc_token.as_deref(), Some("abc"));
        assert_eq!(config.auth.user, None);
    }

    #[test]
    fn test_parse_empty_file() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::parse("[cmdb]\nread_endpiont = \"x\"\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/bulksend.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/bulksend.toml"));
    }
}
