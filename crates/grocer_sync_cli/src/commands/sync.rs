//! Sync command implementation.

use grocer_sync_engine::{
    FileStateStore, HttpGateway, InMemoryStateServer, LoopbackClient, RetryConfig,
    StaticConnectivity, SyncConfig, SyncOrchestrator, SyncSummary,
};
use grocer_sync_protocol::{EntityKind, ServerState};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const LOOPBACK_URL: &str = "loopback://grocer";

/// Options for one sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local state file.
    pub local: PathBuf,
    /// Remote state file.
    pub remote: PathBuf,
    /// Report the device as offline.
    pub offline: bool,
    /// Attempts per network call.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Reconcile entities on parallel threads.
    pub concurrent: bool,
}

/// Runs the sync command.
pub fn run(options: &SyncOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summary = execute(options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            print_text_output(&summary);
        }
    }

    Ok(())
}

/// Runs one pass and writes the server's resulting state back to the remote file.
pub fn execute(options: &SyncOptions) -> Result<SyncSummary, Box<dyn std::error::Error>> {
    let remote_json = fs::read_to_string(&options.remote)
        .map_err(|e| format!("cannot read remote state {:?}: {}", options.remote, e))?;
    let server = Arc::new(InMemoryStateServer::new(ServerState::from_json(
        &remote_json,
    )?));

    let config = SyncConfig::new(LOOPBACK_URL)
        .with_retry(
            RetryConfig::new(options.max_retries)
                .with_base_delay(Duration::from_millis(options.base_delay_ms)),
        )
        .with_concurrent_entities(options.concurrent);

    let gateway = HttpGateway::from_config(&config, LoopbackClient::new(Arc::clone(&server)));
    let orchestrator = SyncOrchestrator::new(
        config,
        gateway,
        FileStateStore::open(&options.local)?,
        StaticConnectivity::new(!options.offline),
    );

    let summary = orchestrator.perform_full_sync()?;

    if server.resolve_count() > 0 {
        fs::write(&options.remote, server.state().to_json_pretty()?)?;
        info!(path = %options.remote.display(), "remote state updated");
    }

    Ok(summary)
}

fn print_text_output(summary: &SyncSummary) {
    println!("Sync Summary");
    println!("============");
    println!();
    println!("Finished: {}", summary.timestamp);
    println!();
    for kind in EntityKind::ALL {
        let result = summary.result(kind);
        let outcome = result
            .outcome
            .map(|o| format!("{:?}", o))
            .unwrap_or_else(|| "-".into());
        let status = if result.synced { "synced" } else { "FAILED" };
        println!("  {:<8} {:<7} {}", kind.name(), status, outcome);
    }

    if !summary.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &summary.errors {
            println!("  {}", error);
        }
    }
}
