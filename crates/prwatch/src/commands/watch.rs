use std::error::Error;
use std::sync::Arc;

use clap::ArgMatches;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use prwatch_core::{
    Collaborators, FallbackNotification, FileStore, FollowedItemsTracker, GhCliSource,
    HostSignalsHandle, ItemId, Notification, PersistenceStore, PlatformSink, PrwatchConfig,
    SeenStateStore, ViewDefinition, ViewId, ViewPollingCoordinator, ViewRefresh, ViewSelector,
};
use prwatch_paths::PrwatchPaths;

use super::helpers::{
    is_valid_repository, load_config_with_warning, parse_followed_ids, resolve_paths_reporting,
    wait_for_shutdown_signal,
};

struct WatchOptions {
    repositories: Vec<String>,
    search: Option<String>,
    followed: Vec<ItemId>,
    mark_seen: bool,
}

pub(crate) fn handle_watch_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let repositories: Vec<String> = matches
        .get_many::<String>("repo")
        .unwrap_or_default()
        .cloned()
        .collect();

    if let Some(invalid) = repositories.iter().find(|r| !is_valid_repository(r)) {
        eprintln!("Invalid repository '{}': expected owner/name", invalid);
        error!(event = "cli.watch_failed", error = "invalid repository", repository = %invalid);
        return Err(format!("invalid repository: {}", invalid).into());
    }

    let followed = match parse_followed_ids(matches.get_many::<String>("follow").unwrap_or_default())
    {
        Ok(ids) => ids,
        Err(invalid) => {
            eprintln!("Invalid pull request '{}': expected owner/name#N", invalid);
            error!(event = "cli.watch_failed", error = "invalid followed id", id = %invalid);
            return Err(format!("invalid pull request id: {}", invalid).into());
        }
    };

    let mut config = load_config_with_warning();
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.polling.interval_seconds = Some(*interval);
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        error!(event = "cli.watch_failed", error = %e);
        return Err(e.into());
    }

    let options = WatchOptions {
        repositories,
        search: matches.get_one::<String>("search").cloned(),
        followed,
        mark_seen: matches.get_flag("mark-seen"),
    };

    info!(
        event = "cli.watch_started",
        repositories = options.repositories.len(),
        followed = options.followed.len(),
        interval_seconds = config.polling.interval_seconds(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_watch(config, options))
}

async fn run_watch(config: PrwatchConfig, options: WatchOptions) -> Result<(), Box<dyn Error>> {
    let gh = GhCliSource::new();
    if !gh.is_available() {
        eprintln!("GitHub CLI (gh) not found on PATH. Install it and run `gh auth login`.");
        error!(event = "cli.watch_failed", error = "gh not found");
        return Err("gh not found".into());
    }
    let source = Arc::new(gh);

    let paths = resolve_paths_reporting(PrwatchPaths::resolve)?;
    let store: Arc<dyn PersistenceStore> = Arc::new(FileStore::new(paths));
    let seen = SeenStateStore::load(store).await;

    let tracker = Arc::new(FollowedItemsTracker::new(source.clone()));
    for id in options.followed.iter().cloned() {
        tracker.follow(id);
    }

    let definitions: Vec<ViewDefinition> = options
        .repositories
        .iter()
        .map(|repository| {
            ViewDefinition::remote(
                repository.as_str(),
                ViewSelector {
                    search: options.search.clone(),
                    ..ViewSelector::repository(repository.as_str())
                },
            )
        })
        .collect();
    let view_ids: Vec<ViewId> = definitions.iter().map(|d| d.id.clone()).collect();

    let coordinator = ViewPollingCoordinator::new(
        Collaborators {
            source,
            followed: tracker,
            sink: Arc::new(PlatformSink::new()),
            host: Arc::new(HostSignalsHandle::default()),
        },
        &config,
        definitions,
    );

    let fallback_printer = tokio::spawn(print_fallbacks(coordinator.subscribe_fallback()));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal(signal_token).await {
            error!(event = "cli.watch.signal_handler_failed", error = %e);
        }
    });

    coordinator.start_polling().await;

    let mut ticker = tokio::time::interval(config.polling.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut first_sweep = true;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                sweep(&coordinator, &view_ids, &seen, options.mark_seen, first_sweep).await;
                first_sweep = false;
                if !config.polling.enabled() {
                    info!(event = "cli.watch.single_sweep", reason = "polling disabled");
                    break;
                }
            }
        }
    }

    coordinator.stop_polling().await;
    coordinator.shutdown().await;
    fallback_printer.abort();
    seen.flush().await;

    info!(event = "cli.watch_completed", seen_entries = seen.len());
    Ok(())
}

/// Refresh every repository view once. The first sweep also polls followed
/// items so their baseline is warm before the scheduler's first tick.
async fn sweep(
    coordinator: &ViewPollingCoordinator,
    view_ids: &[ViewId],
    seen: &SeenStateStore,
    mark_seen: bool,
    first_sweep: bool,
) {
    for (index, view) in view_ids.iter().enumerate() {
        let refresh = if first_sweep && index == 0 {
            let outcome = coordinator.refresh().await;
            for error in &outcome.followed.errors {
                eprintln!("Followed pull requests: {}", error);
            }
            outcome.view
        } else {
            coordinator.refresh_view(view).await
        };

        match refresh {
            ViewRefresh::Committed { notifications, .. } => {
                for notification in &notifications {
                    print_notification(notification);
                }
                let snapshot = coordinator.views().get(view);
                println!(
                    "{}: {} pull requests, {} unseen",
                    view,
                    snapshot.items.len(),
                    seen.unseen_count(&snapshot.items)
                );
                if mark_seen {
                    seen.mark_all_seen(&snapshot.items, Some(view));
                }
            }
            ViewRefresh::Failed { message, .. } => {
                eprintln!("{}: refresh failed: {}", view, message);
                warn!(event = "cli.watch.refresh_failed", view_id = %view, error = %message);
            }
            ViewRefresh::Superseded { generation } => {
                debug!(event = "cli.watch.refresh_superseded", view_id = %view, generation = generation);
            }
            ViewRefresh::Skipped => {}
        }
    }
}

fn print_notification(notification: &Notification) {
    println!("* {}: {}", notification.title, notification.body);
    if let Some(url) = &notification.url {
        println!("  {}", url);
    }
}

/// Notifications the desktop could not show are printed instead.
async fn print_fallbacks(mut fallbacks: broadcast::Receiver<FallbackNotification>) {
    loop {
        match fallbacks.recv().await {
            Ok(fallback) => {
                println!(
                    "* {}: {} ({})",
                    fallback.notification.title, fallback.notification.body, fallback.reason
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(event = "cli.watch.fallback_lagged", skipped = skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
