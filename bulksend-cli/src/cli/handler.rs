//! Push command handler

use std::fs;
use std::io::{self, Read};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::*;
use reqwest::Client;

use super::Cli;
use crate::api::{BulkPublisher, CmdbClient, build_http_client};
use crate::config::{FileConfig, RunConfig, TargetSource};
use crate::sync::{HttpBackend, Reconciler, SnapshotBackend, SourceIndex, SyncPlan, TargetIndex};

/// Reconcile CIP records against the CMDB and push the result
pub async fn handle_push(cli: Cli) -> Result<()> {
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let config = RunConfig::resolve(&cli, &file_config)?;
    let http = build_http_client(config.http.timeout)?;

    let source = read_source(&config)?;
    log::info!("Read {} CIP records", source.len());

    let mut target = build_target_index(&config, &http)?;
    log::debug!("CMDB records come from the {} backend", target.backend_name());

    let start = Instant::now();
    let plan = Reconciler::new(&source, &mut target, config.policy)
        .run()
        .await
        .context("Failed to reconcile CIP records against the CMDB")?;
    print_summary(&plan, start.elapsed().as_millis());

    let body = plan
        .to_bulk_json(true)
        .context("Failed to serialize bulk request")?;
    log::debug!("Bulk request body:\n{}", body);

    if let Some(path) = &config.output {
        fs::write(path, &body)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        eprintln!("Bulk request written to {}", path.display().to_string().cyan());
    }

    if config.dry_run {
        println!("{}", body);
        return Ok(());
    }

    if plan.is_empty() {
        eprintln!("{}", "Nothing to push".yellow());
        return Ok(());
    }

    let Some(write) = config.write else {
        anyhow::bail!("No CMDB write endpoint configured");
    };
    let outcome = BulkPublisher::new(http, write.endpoint.as_str(), write.credentials)
        .publish(plan.records())
        .await?;

    eprintln!(
        "{} {} records pushed (HTTP {})",
        "✓".green().bold(),
        plan.len(),
        outcome.status
    );
    Ok(())
}

fn read_source(config: &RunConfig) -> Result<SourceIndex> {
    match &config.input {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            SourceIndex::from_reader(io::BufReader::new(file))
                .with_context(|| format!("Invalid CIP records in {}", path.display()))
        }
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read CIP records from stdin")?;
            SourceIndex::from_reader(content.as_bytes()).context("Invalid CIP records on stdin")
        }
    }
}

fn build_target_index(config: &RunConfig, http: &Client) -> Result<TargetIndex> {
    let index = match &config.target {
        TargetSource::File(path) => TargetIndex::new(Box::new(SnapshotBackend::from_path(path)?)),
        TargetSource::Http(url) => TargetIndex::new(Box::new(HttpBackend::new(CmdbClient::new(
            http.clone(),
            url.clone(),
        )))),
        TargetSource::None => TargetIndex::empty(),
    };
    Ok(index.fail_on_backend_error(config.policy.fail_on_backend_error))
}

fn print_summary(plan: &SyncPlan, elapsed_ms: u128) {
    eprintln!(
        "{} {} records in {}ms: {} create, {} update, {} delete",
        "Reconciled".bold(),
        plan.len(),
        elapsed_ms,
        plan.create_count().to_string().green(),
        plan.update_count().to_string().cyan(),
        plan.delete_count().to_string().red()
    );
}
