//! `cloudfenced`: host data-loss-prevention daemon for cloud-sync trees and
//! external disks.
//!
//! Loads a JSON policy (provider kind -> block level), arms the daemon, and
//! reports counters periodically until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cloudfence_core::PolicyMap;
use cloudfence_daemon::channel::NullEventChannel;
use cloudfence_daemon::daemon::Daemon;
use cloudfence_daemon::disk::NullDiskArbiter;
use cloudfence_daemon::roots::{HomeSyncRoots, SyncRoots};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cloudfenced", version, about)]
struct Args {
    /// Policy file: JSON object mapping provider kind to block level,
    /// e.g. `{"icloud": "full", "dropbox": "readonly"}`.
    #[arg(long)]
    policy: PathBuf,

    /// Seconds between periodic stats reports.
    #[arg(long, default_value_t = 60)]
    stats_interval: u64,

    /// Override the home directory used for sync-root discovery.
    #[arg(long)]
    home: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let raw = std::fs::read_to_string(&args.policy)
        .with_context(|| format!("failed to read policy file {}", args.policy.display()))?;
    let policy: PolicyMap = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse policy file {}", args.policy.display()))?;

    let roots: Box<dyn SyncRoots> = match args.home {
        Some(home) => Box::new(HomeSyncRoots::new(home)),
        None => Box::new(HomeSyncRoots::for_current_user()?),
    };

    let daemon = Daemon::new(Arc::new(NullEventChannel), Arc::new(NullDiskArbiter), roots);
    daemon.init()?;
    if let Err(err) = daemon.configure(&policy) {
        daemon.uninit();
        return Err(err).context("policy rejected");
    }
    info!(policy = %args.policy.display(), "cloudfenced running");

    let mut report_timer =
        tokio::time::interval(Duration::from_secs(args.stats_interval.max(1)));
    report_timer.tick().await; // the first tick completes immediately
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::warn!(%err, "signal listener failed, shutting down");
                }
                break;
            }
            _ = report_timer.tick() => {
                daemon.print_stats();
            }
        }
    }

    daemon.uninit();
    info!("cloudfenced stopped");
    Ok(())
}
