//! GitHub data source using the `gh` CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::forge::errors::ForgeError;
use crate::forge::traits::DataSource;
use crate::forge::types::{
    ItemBatch, ItemFailure, ItemId, PageInfo, PrState, PullRequestItem, ViewSelector,
};
use crate::prefetch::{PrefetchCategory, PrefetchFetcher};

/// JSON fields requested from `gh pr list` / `gh pr view`.
const PR_JSON_FIELDS: &str = "number,title,url,state,isDraft,author,comments,reviews,updatedAt";

/// Default page size when the selector does not set one.
const DEFAULT_LIMIT: u32 = 50;

/// GitHub data source backed by the `gh` CLI.
///
/// Authentication is whatever `gh auth` has configured; rate limiting and
/// retries are left to `gh` itself.
#[derive(Debug, Default, Clone)]
pub struct GhCliSource;

impl GhCliSource {
    pub fn new() -> Self {
        Self
    }

    /// Whether the `gh` binary is on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which("gh").is_ok()
    }

    async fn run_gh(&self, args: &[&str]) -> Result<String, ForgeError> {
        debug!(event = "core.forge.gh_started", args = ?args);

        let output = tokio::process::Command::new("gh")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ForgeError::CliNotFound {
                        cli: "gh".to_string(),
                    }
                } else {
                    ForgeError::from(e)
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ForgeError::CliError {
                message: format!(
                    "gh {} failed (exit {}): {}",
                    args.first().copied().unwrap_or_default(),
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            })
        }
    }

    async fn list_repository(
        &self,
        repository: &str,
        selector: &ViewSelector,
    ) -> Result<ItemBatch, ForgeError> {
        let limit = selector.limit.unwrap_or(DEFAULT_LIMIT);
        let limit_arg = limit.to_string();
        let mut args: Vec<&str> = vec![
            "pr",
            "list",
            "--repo",
            repository,
            "--limit",
            limit_arg.as_str(),
            "--json",
            PR_JSON_FIELDS,
        ];
        if let Some(search) = selector.search.as_deref() {
            args.push("--search");
            args.push(search);
        }

        let stdout = self.run_gh(&args).await?;
        let items = parse_pr_list(&stdout, repository)?;

        // `gh pr list` does not expose cursors; a full page implies more may exist.
        let page_info = PageInfo {
            has_next_page: items.len() as u32 >= limit,
            end_cursor: None,
        };

        Ok(ItemBatch {
            items,
            page_info,
            failures: Vec::new(),
        })
    }

    async fn view_items(&self, ids: &[ItemId]) -> Result<ItemBatch, ForgeError> {
        // A malformed id is a caller error and rejects the whole request.
        let targets = ids
            .iter()
            .map(|id| pull_request_parts(id).map(|parts| (id, parts)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(targets.len());
        for (id, (repository, number)) in targets {
            let result = self.view_item(repository, number).await;
            if let Err(e) = &result {
                warn!(event = "core.forge.item_fetch_failed", item = %id, error = %e);
            }
            results.push((id.clone(), result));
        }

        Ok(collect_item_results(results))
    }

    async fn view_item(&self, repository: &str, number: u64) -> Result<PullRequestItem, ForgeError> {
        let number_arg = number.to_string();
        let stdout = self
            .run_gh(&[
                "pr",
                "view",
                number_arg.as_str(),
                "--repo",
                repository,
                "--json",
                PR_JSON_FIELDS,
            ])
            .await?;
        parse_pr_view(&stdout, repository)
    }
}

#[async_trait]
impl DataSource for GhCliSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_items(&self, selector: &ViewSelector) -> Result<ItemBatch, ForgeError> {
        if !selector.item_ids.is_empty() {
            return self.view_items(&selector.item_ids).await;
        }

        match selector.repository.as_deref() {
            Some(repository) => self.list_repository(repository, selector).await,
            None => Err(ForgeError::InvalidSelector {
                message: "selector needs a repository or explicit item ids".to_string(),
            }),
        }
    }

    async fn current_user_id(&self) -> Result<String, ForgeError> {
        let stdout = self.run_gh(&["api", "user", "-q", ".login"]).await?;
        let login = stdout.trim();
        if login.is_empty() {
            return Err(ForgeError::ParseError {
                message: "gh api user returned an empty login".to_string(),
            });
        }
        Ok(login.to_string())
    }
}

#[async_trait]
impl PrefetchFetcher for GhCliSource {
    async fn fetch(
        &self,
        id: &ItemId,
        category: PrefetchCategory,
    ) -> Result<serde_json::Value, ForgeError> {
        let (repository, number) = pull_request_parts(id)?;
        let number_arg = number.to_string();
        let stdout = self
            .run_gh(&[
                "pr",
                "view",
                number_arg.as_str(),
                "--repo",
                repository,
                "--json",
                prefetch_fields(category),
            ])
            .await?;
        serde_json::from_str(&stdout).map_err(|e| ForgeError::ParseError {
            message: format!("gh pr view {} output: {}", category, e),
        })
    }
}

fn prefetch_fields(category: PrefetchCategory) -> &'static str {
    match category {
        PrefetchCategory::Details => "body,labels,assignees,reviewRequests,headRefName,baseRefName",
        PrefetchCategory::Comments => "comments,reviews",
        PrefetchCategory::Checks => "statusCheckRollup",
    }
}

/// Splits per-id fetch results into the loaded items and the failures.
fn collect_item_results(
    results: Vec<(ItemId, Result<PullRequestItem, ForgeError>)>,
) -> ItemBatch {
    let mut batch = ItemBatch::default();
    for (id, result) in results {
        match result {
            Ok(item) => batch.items.push(item),
            Err(e) => batch.failures.push(ItemFailure {
                id,
                message: e.to_string(),
            }),
        }
    }
    batch
}

fn pull_request_parts(id: &ItemId) -> Result<(&str, u64), ForgeError> {
    id.pull_request_parts()
        .ok_or_else(|| ForgeError::InvalidSelector {
            message: format!("'{}' is not a pull request id (owner/repo#N)", id),
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    title: String,
    url: String,
    state: String,
    #[serde(default)]
    is_draft: bool,
    author: Option<GhActor>,
    #[serde(default)]
    comments: Vec<serde_json::Value>,
    #[serde(default)]
    reviews: Vec<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GhActor {
    login: String,
}

fn parse_pr_list(json_str: &str, repository: &str) -> Result<Vec<PullRequestItem>, ForgeError> {
    let raw: Vec<GhPullRequest> =
        serde_json::from_str(json_str).map_err(|e| ForgeError::ParseError {
            message: format!("gh pr list output: {}", e),
        })?;
    Ok(raw
        .into_iter()
        .map(|pr| into_item(pr, repository))
        .collect())
}

fn parse_pr_view(json_str: &str, repository: &str) -> Result<PullRequestItem, ForgeError> {
    let raw: GhPullRequest =
        serde_json::from_str(json_str).map_err(|e| ForgeError::ParseError {
            message: format!("gh pr view output: {}", e),
        })?;
    Ok(into_item(raw, repository))
}

fn into_item(pr: GhPullRequest, repository: &str) -> PullRequestItem {
    let state = match pr.state.to_uppercase().as_str() {
        "MERGED" => PrState::Merged,
        "CLOSED" => PrState::Closed,
        "OPEN" if pr.is_draft => PrState::Draft,
        "OPEN" => PrState::Open,
        unknown => {
            warn!(
                event = "core.forge.pr_state_unknown",
                repository = repository,
                number = pr.number,
                state = unknown,
            );
            PrState::Open
        }
    };

    let activity_count = (pr.comments.len() + pr.reviews.len()).min(u32::MAX as usize) as u32;

    PullRequestItem {
        id: ItemId::for_pull_request(repository, pr.number),
        number: pr.number,
        title: pr.title,
        repository: repository.to_string(),
        url: pr.url,
        author: pr.author.map(|a| a.login).unwrap_or_default(),
        state,
        activity_count,
        updated_at: pr.updated_at,
    }
}
