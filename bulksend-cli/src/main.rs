use anyhow::Result;
use clap::Parser;

use bulksend_cli::cli::{Cli, handle_push};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    handle_push(cli).await
}
