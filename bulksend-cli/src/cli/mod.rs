//! Command-line interface

pub mod handler;

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub use handler::handle_push;

/// CIP->CMDBv1 data pusher
///
/// Reads CIP records (a JSON array) from stdin, reconciles them against the
/// CMDB and submits the resulting creates, updates and deletes as one bulk
/// write.
#[derive(Debug, Clone, Parser)]
#[command(name = "bulksend2cmdb", version, about, long_about = None)]
pub struct Cli {
    /// Specify CMDB read URL
    #[arg(long, value_name = "URL", env = "CMDB_READ_ENDPOINT", conflicts_with = "cmdb_data_file")]
    pub cmdb_read_endpoint: Option<String>,

    /// Specify CMDB write URL
    #[arg(long, value_name = "URL", env = "CMDB_WRITE_ENDPOINT")]
    pub cmdb_write_endpoint: Option<String>,

    /// OpenID (bearer) token value for authentication
    #[arg(
        long,
        value_name = "TOKEN",
        env = "CMDB_OIDC_TOKEN",
        hide_env_values = true,
        conflicts_with_all = ["cmdb_db_user", "cmdb_db_pass"]
    )]
    pub oidc_token: Option<String>,

    /// With password authentication, this specifies CMDB username
    #[arg(long, value_name = "USERNAME", env = "CMDB_DB_USER")]
    pub cmdb_db_user: Option<String>,

    /// With password authentication, this specifies CMDB password
    #[arg(long, value_name = "PASSWORD", env = "CMDB_DB_PASS", hide_env_values = true)]
    pub cmdb_db_pass: Option<String>,

    /// Specify a JSON file for CMDB data rather than getting remotely
    #[arg(long, value_name = "JSON_FILE", env = "CMDB_DATA_FILE")]
    pub cmdb_data_file: Option<PathBuf>,

    /// Do not post to remote CMDB service
    #[arg(long)]
    pub dry_run: bool,

    /// Read CIP records from this file instead of stdin
    #[arg(short, long, value_name = "JSON_FILE")]
    pub input: Option<PathBuf>,

    /// Also write the bulk request body to this file
    #[arg(short, long, value_name = "JSON_FILE")]
    pub output: Option<PathBuf>,

    /// Abort when CIP data repeats a business key under the same parent
    #[arg(long)]
    pub strict_source_keys: bool,

    /// Abort when the CMDB cannot be read instead of treating it as empty
    #[arg(long)]
    pub fail_on_backend_error: bool,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Configuration file (default: ~/.config/bulksend2cmdb/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
