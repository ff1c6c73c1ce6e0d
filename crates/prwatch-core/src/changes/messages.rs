//! User-facing wording for change notifications.
//!
//! One change produces a message naming the item; several changes are
//! folded into a single combined message grouped by repository.

use std::collections::BTreeMap;

use crate::changes::detector::{ActivityChange, ChangeSet};
use crate::forge::types::PullRequestItem;
use crate::notify::{Notification, NotificationKind};

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// `"acme/gadgets (1), acme/widgets (2)"`, repositories sorted by name.
fn repository_summary<'a>(repositories: impl Iterator<Item = (&'a str, usize)>) -> String {
    let mut grouped: BTreeMap<&str, usize> = BTreeMap::new();
    for (repository, count) in repositories {
        *grouped.entry(repository).or_default() += count;
    }
    grouped
        .iter()
        .map(|(repository, count)| format!("{} ({})", repository, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(item: &PullRequestItem) -> String {
    format!("#{} {}", item.number, item.title)
}

/// Notification for items that were not in the previous batch.
pub fn new_items_message(items: &[PullRequestItem]) -> Option<Notification> {
    let notification = match items {
        [] => return None,
        [item] => {
            let mut body = describe(item);
            if !item.author.is_empty() {
                body.push_str(&format!(" by {}", item.author));
            }
            Notification::new("New pull request", body)
                .with_subtitle(item.repository.clone())
                .with_url(item.url.clone())
        }
        many => Notification::new(
            plural(many.len(), "new pull request", "new pull requests"),
            repository_summary(many.iter().map(|i| (i.repository.as_str(), 1))),
        ),
    };
    Some(notification.with_kind(NotificationKind::NewItem))
}

/// Notification for existing items whose activity count grew.
pub fn new_activity_message(changes: &[ActivityChange]) -> Option<Notification> {
    let notification = match changes {
        [] => return None,
        [change] => Notification::new(
            "New activity",
            format!(
                "{} on {}",
                plural(change.delta as usize, "new comment", "new comments"),
                describe(&change.item)
            ),
        )
        .with_subtitle(change.item.repository.clone())
        .with_url(change.item.url.clone()),
        many => {
            let total: usize = many.iter().map(|c| c.delta as usize).sum();
            Notification::new(
                format!(
                    "New activity on {}",
                    plural(many.len(), "pull request", "pull requests")
                ),
                format!(
                    "{}: {}",
                    plural(total, "new comment", "new comments"),
                    repository_summary(
                        many.iter()
                            .map(|c| (c.item.repository.as_str(), c.delta as usize))
                    )
                ),
            )
        }
    };
    Some(notification.with_kind(NotificationKind::NewActivity))
}

/// Flags deciding which kinds of change reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationGates {
    pub enabled: bool,
    pub on_new_item: bool,
    pub on_new_activity: bool,
}

impl From<&prwatch_config::NotificationConfig> for NotificationGates {
    fn from(config: &prwatch_config::NotificationConfig) -> Self {
        Self {
            enabled: config.enabled(),
            on_new_item: config.on_new_item(),
            on_new_activity: config.on_new_activity(),
        }
    }
}

impl NotificationGates {
    /// Whether a notification of `kind` may be delivered.
    pub fn allows(self, kind: NotificationKind) -> bool {
        self.enabled
            && match kind {
                NotificationKind::General => true,
                NotificationKind::NewItem => self.on_new_item,
                NotificationKind::NewActivity => self.on_new_activity,
            }
    }
}

impl Default for NotificationGates {
    fn default() -> Self {
        Self::from(&prwatch_config::NotificationConfig::default())
    }
}

/// Every notification a change set produces, before any gate applies.
pub fn build(changes: &ChangeSet) -> Vec<Notification> {
    new_items_message(&changes.new_items)
        .into_iter()
        .chain(new_activity_message(&changes.new_activity))
        .collect()
}

/// The notifications a change set produces that `gates` let through.
pub fn compose(changes: &ChangeSet, gates: NotificationGates) -> Vec<Notification> {
    let mut notifications = build(changes);
    notifications.retain(|n| gates.allows(n.kind));
    notifications
}
