use clap::ArgMatches;
use serde::Serialize;
use tracing::{error, info};

use prwatch_core::PrwatchConfig;

use super::helpers::load_config_with_warning;

/// Every setting with its default filled in.
#[derive(Debug, Serialize)]
struct EffectiveConfig {
    polling: EffectivePolling,
    notifications: EffectiveNotifications,
    prefetch: EffectivePrefetch,
    follow_up: EffectiveFollowUp,
}

#[derive(Debug, Serialize)]
struct EffectivePolling {
    enabled: bool,
    interval_seconds: u64,
    background_enabled: bool,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct EffectiveNotifications {
    enabled: bool,
    on_new_item: bool,
    on_new_activity: bool,
}

#[derive(Debug, Serialize)]
struct EffectivePrefetch {
    on_hover_enabled: bool,
}

#[derive(Debug, Serialize)]
struct EffectiveFollowUp {
    enabled: bool,
}

impl From<&PrwatchConfig> for EffectiveConfig {
    fn from(config: &PrwatchConfig) -> Self {
        Self {
            polling: EffectivePolling {
                enabled: config.polling.enabled(),
                interval_seconds: config.polling.interval_seconds(),
                background_enabled: config.polling.background_enabled(),
                timeout_seconds: config.polling.timeout_seconds(),
            },
            notifications: EffectiveNotifications {
                enabled: config.notifications.enabled(),
                on_new_item: config.notifications.on_new_item(),
                on_new_activity: config.notifications.on_new_activity(),
            },
            prefetch: EffectivePrefetch {
                on_hover_enabled: config.prefetch.on_hover_enabled(),
            },
            follow_up: EffectiveFollowUp {
                enabled: config.follow_up.enabled(),
            },
        }
    }
}

pub(crate) fn handle_config_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    info!(event = "cli.config_started", json_output = json_output);

    let config = load_config_with_warning();
    if let Err(e) = config.validate() {
        eprintln!("Warning: {}", e);
        error!(event = "cli.config.validation_failed", error = %e);
    }

    let effective = EffectiveConfig::from(&config);
    let rendered = if json_output {
        serde_json::to_string_pretty(&effective)?
    } else {
        toml::to_string(&effective)?
    };
    println!("{}", rendered.trim_end());

    info!(event = "cli.config_completed");
    Ok(())
}
