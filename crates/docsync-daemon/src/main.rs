//! docsync daemon - background synchronization service
//!
//! `docsyncd` loads the YAML configuration, opens one index database per
//! synchronized root, and runs one scheduler task per root. Roots are
//! fully independent: each has its own remote session, index, watcher and
//! pass cadence, and a failing root never blocks the others.
//!
//! Shutdown is cooperative: SIGTERM or SIGINT cancels a shared token, the
//! schedulers finish their current pass, and the process exits.

mod remote;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docsync_core::config::{Config, IgnoreRules, RootConfig};
use docsync_core::domain::{RemotePath, RootMapping};
use docsync_core::ports::NullActivityListener;
use docsync_index::{IndexPool, SqliteLocalIndex};
use docsync_sync::{FileWatcher, Reconciler, SyncScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    // RUST_LOG wins over the configured level.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "docsync daemon starting (docsyncd)");

    anyhow::ensure!(
        !config.roots.is_empty(),
        "No synchronized roots configured in {}",
        config_path.display()
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut tasks = Vec::new();
    for root in &config.roots {
        match start_root(root, &config, shutdown.child_token()).await {
            Ok(task) => tasks.push(task),
            Err(e) => {
                error!(root = %root.name, error = format!("{e:#}"), "Failed to start root");
            }
        }
    }
    anyhow::ensure!(!tasks.is_empty(), "No synchronized root could be started");

    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "Root task panicked");
        }
    }

    info!("docsync daemon shut down");
    Ok(())
}

/// Wires up and spawns the scheduler task for one root
async fn start_root(
    root: &RootConfig,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>> {
    anyhow::ensure!(
        root.local_root.is_dir(),
        "Local root {} is not a directory",
        root.local_root.display()
    );

    let remote_root = RemotePath::new(root.remote_root.clone())
        .with_context(|| format!("Invalid remote root for '{}'", root.name))?;
    let mapping = RootMapping::new(root.local_root.clone(), remote_root)?;
    let rules = IgnoreRules::new(&root.ignored_paths);

    let db_path = index_db_path(&root.name);
    let pool = IndexPool::new(&db_path)
        .await
        .with_context(|| format!("Failed to open index for '{}'", root.name))?;
    let index = Arc::new(SqliteLocalIndex::new(pool.pool().clone()));

    let session = remote::connect(root)?;
    let reconciler = Arc::new(Reconciler::new(
        session,
        index,
        Arc::new(NullActivityListener),
        mapping,
        rules,
        root.poll_interval,
    ));

    let (mut watcher, change_rx) = FileWatcher::new()?;
    watcher.watch(&root.local_root)?;

    let scheduler = SyncScheduler::new(
        reconciler,
        change_rx,
        Duration::from_secs(config.watcher.debounce_delay),
        Duration::from_secs(root.poll_interval.max(1)),
        shutdown,
    );

    info!(
        root = %root.name,
        local = %root.local_root.display(),
        remote = %root.remote_root,
        "Root starting"
    );

    let name = root.name.clone();
    Ok(tokio::spawn(async move {
        // The watcher must outlive the scheduler or the OS watches drop.
        let _watcher = watcher;
        scheduler.run().await;
        info!(root = %name, "Root stopped");
    }))
}

/// Per-root index database under the XDG data dir
fn index_db_path(root_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docsync")
        .join(format!("{root_name}.db"))
}

/// Cancels the token on SIGTERM or SIGINT
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_token_propagates_to_children() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_index_db_path_uses_root_name() {
        let path = index_db_path("work");
        assert!(path.ends_with("docsync/work.db"));
    }

    #[test]
    fn test_unconfigured_root_has_no_adapter() {
        let root = RootConfig::default();
        assert!(remote::connect(&root).is_err());
    }
}
