use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use prwatch_core::{ItemId, PrwatchConfig};
use prwatch_paths::{PathError, PrwatchPaths};

/// Load configuration with warning on errors.
///
/// Falls back to defaults if config loading fails, but notifies the user via:
/// - stderr message for immediate visibility
/// - structured log event `cli.config.load_failed` for debugging
pub fn load_config_with_warning() -> PrwatchConfig {
    match PrwatchConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.prwatch/config.toml and ./.prwatch/config.toml for syntax errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            PrwatchConfig::default()
        }
    }
}

/// `owner/name` with both parts non-empty and no whitespace.
pub fn is_valid_repository(name: &str) -> bool {
    match name.split_once('/') {
        Some((owner, repo)) => {
            !owner.is_empty()
                && !repo.is_empty()
                && !repo.contains('/')
                && !name.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Parse `owner/name#N` arguments, returning the first malformed one as error.
pub fn parse_followed_ids<'a>(
    values: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<ItemId>, String> {
    values
        .into_iter()
        .map(|value| {
            let id = ItemId::from(value.as_str());
            match id.pull_request_parts() {
                Some((repository, _)) if is_valid_repository(repository) => Ok(id),
                _ => Err(value.clone()),
            }
        })
        .collect()
}

/// Wait for SIGINT/Ctrl-C (and SIGTERM on unix), then cancel `token`.
pub async fn wait_for_shutdown_signal(token: CancellationToken) -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            _ = ctrl_c => {
                info!(event = "cli.watch.signal_received", signal = "SIGINT");
            }
            _ = sigterm.recv() => {
                info!(event = "cli.watch.signal_received", signal = "SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        info!(event = "cli.watch.signal_received", signal = "SIGINT");
    }

    token.cancel();
    Ok(())
}

/// Resolve `~/.prwatch`, telling the user on stderr when that fails.
pub fn resolve_paths_reporting(
    resolve: impl FnOnce() -> Result<PrwatchPaths, PathError>,
) -> Result<PrwatchPaths, PathError> {
    resolve().inspect_err(|e| {
        eprintln!("Could not resolve ~/.prwatch: {}", e);
        error!(event = "cli.watch_failed", error = %e);
    })
}
