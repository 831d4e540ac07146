//! Run configuration
//!
//! Settings come from command-line flags, then environment variables (both
//! handled by clap, after `.env` is loaded), then the optional TOML file,
//! then built-in defaults.

pub mod file;

pub use file::FileConfig;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::api::Credentials;
use crate::cli::Cli;
use crate::sync::IntegrityPolicy;

/// Where the current CMDB contents are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Pre-loaded snapshot file
    File(PathBuf),
    /// CMDB read API
    Http(Url),
    /// No CMDB data: every record is a creation and nothing is deleted
    None,
}

/// Where and how the bulk write goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub endpoint: Url,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub target: TargetSource,
    pub write: Option<WriteTarget>,
    pub dry_run: bool,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub policy: IntegrityPolicy,
    pub http: HttpSettings,
}

impl RunConfig {
    /// Merge CLI/environment values over the configuration file and validate
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Result<Self> {
        // Read source and credentials are taken whole from the highest layer
        // that sets any part of them
        let target = if cli.cmdb_read_endpoint.is_some() || cli.cmdb_data_file.is_some() {
            resolve_target(cli.cmdb_read_endpoint.clone(), cli.cmdb_data_file.clone())?
        } else {
            resolve_target(file.cmdb.read_endpoint.clone(), file.cmdb.data_file.clone())?
        };

        let credentials =
            if cli.oidc_token.is_some() || cli.cmdb_db_user.is_some() || cli.cmdb_db_pass.is_some() {
                resolve_credentials(
                    cli.oidc_token.clone(),
                    cli.cmdb_db_user.clone(),
                    cli.cmdb_db_pass.clone(),
                )?
            } else {
                resolve_credentials(
                    file.auth.oidc_token.clone(),
                    file.auth.user.clone(),
                    file.auth.password.clone(),
                )?
            };

        let write = cli
            .cmdb_write_endpoint
            .clone()
            .or_else(|| file.cmdb.write_endpoint.clone())
            .map(|endpoint| -> Result<WriteTarget> {
                Ok(WriteTarget {
                    endpoint: parse_url(&endpoint, "CMDB write endpoint")?,
                    credentials,
                })
            })
            .transpose()?;

        if write.is_none() && !cli.dry_run {
            anyhow::bail!("--cmdb-write-endpoint is required unless --dry-run is given");
        }

        let http = cli
            .timeout
            .or(file.cmdb.timeout_secs)
            .map(|secs| HttpSettings {
                timeout: Duration::from_secs(secs),
            })
            .unwrap_or_default();

        Ok(Self {
            target,
            write,
            dry_run: cli.dry_run,
            input: cli.input.clone(),
            output: cli.output.clone(),
            policy: IntegrityPolicy {
                reject_duplicate_source_keys: cli.strict_source_keys,
                fail_on_backend_error: cli.fail_on_backend_error,
            },
            http,
        })
    }
}

fn parse_url(value: &str, what: &str) -> Result<Url> {
    Url::parse(value).with_context(|| format!("Invalid {} URL: {}", what, value))
}

fn resolve_target(read_endpoint: Option<String>, data_file: Option<PathBuf>) -> Result<TargetSource> {
    match (read_endpoint, data_file) {
        (Some(_), Some(_)) => {
            anyhow::bail!("Specify either a CMDB read endpoint or a CMDB data file, not both")
        }
        (Some(endpoint), None) => Ok(TargetSource::Http(parse_url(&endpoint, "CMDB read endpoint")?)),
        (None, Some(path)) => Ok(TargetSource::File(path)),
        (None, None) => {
            log::warn!("No CMDB read endpoint or data file given - every record will be created");
            Ok(TargetSource::None)
        }
    }
}

fn resolve_credentials(
    token: Option<String>,
    user: Option<String>,
    password: Option<String>,
) -> Result<Option<Credentials>> {
    match (token, user, password) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            anyhow::bail!("Specify either an OpenID token or a user/password pair, not both")
        }
        (Some(token), None, None) => Ok(Some(Credentials::bearer(token))),
        (None, Some(user), Some(password)) => Ok(Some(Credentials::basic(user, password))),
        (None, Some(_), None) => anyhow::bail!("--cmdb-db-user requires --cmdb-db-pass"),
        (None, None, Some(_)) => anyhow::bail!("--cmdb-db-pass requires --cmdb-db-user"),
        (None, None, None) => Ok(None),
    }
}
