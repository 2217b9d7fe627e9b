use crate::error::Result;
use crate::frontier::{EnqueueResult, Frontier};
use crate::records::StatsResult;
use crate::storage::Storage;
use crate::target::ValidTarget;
use fedistats_scanner::{FetchFailure, Fetcher, ResourceStatus, Transport};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    /// Stop after this many fetched targets. Checked between targets only.
    pub fetch_limit: Option<usize>,
    pub show_progress_bars: bool,
    /// When set, the spinner is drawn through it. Loggers holding the same
    /// handle can then print above the spinner without tearing it.
    pub multi_progress: Option<MultiProgress>,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub fetched: usize,
    pub succeeded: usize,
    pub gone: usize,
    pub not_supported: usize,
    pub unknown: usize,
    /// Targets whose endpoint had already been measured under another name.
    pub aliases_skipped: usize,
    pub peers_failed: usize,
    pub peers_discovered: usize,
    pub newly_queued: usize,
    pub peer_lists_with_ng: usize,
    pub peer_lists_with_invalid: usize,
    pub remaining_queue: usize,
    pub checked_endpoints: usize,
}

impl CrawlSummary {
    pub fn failed(&self) -> usize {
        self.gone + self.not_supported + self.unknown
    }

    fn count_failure(&mut self, status: ResourceStatus) {
        match status {
            ResourceStatus::Gone => self.gone += 1,
            ResourceStatus::NotSupported => self.not_supported += 1,
            ResourceStatus::Unknown => self.unknown += 1,
        }
    }
}

/// Walk the frontier one target at a time until the queue drains or the
/// fetch limit is reached.
pub async fn execute_crawl<T, S>(
    options: CrawlOptions,
    fetcher: &Fetcher<T>,
    frontier: &mut Frontier<S>,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary>
where
    T: Transport,
    S: Storage,
{
    let CrawlOptions {
        seeds,
        fetch_limit,
        show_progress_bars,
        multi_progress,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = match &multi_progress {
            Some(mp) => mp.add(ProgressBar::new_spinner()),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let report = |msg: String| {
        if let Some(ref callback) = progress_callback {
            callback(msg);
        }
    };

    let mut summary = CrawlSummary::default();

    let seeded = frontier.enqueue_targets(&seeds, None)?;
    warn_flagged("The seed hosts", &seeded);
    summary.newly_queued += seeded.queued;

    let mut remaining = fetch_limit;
    while remaining != Some(0) {
        let Some(target) = frontier.dequeue_target() else {
            break;
        };

        if let Some(ref mut limit) = remaining {
            *limit -= 1;
        }
        summary.fetched += 1;

        let msg = format!(
            "[{:>8} rests | {} checked]: fetch {}",
            frontier.queued_targets_count(),
            frontier.checked_endpoints_count(),
            target.target
        );
        if let Some(ref pb) = progress_bar {
            pb.set_message(msg.clone());
        }
        report(msg);

        crawl_target(fetcher, frontier, &target, &mut summary).await?;
    }

    summary.remaining_queue = frontier.queued_targets_count();
    summary.checked_endpoints = frontier.checked_endpoints_count();

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} targets fetched, {} still queued",
            summary.fetched, summary.remaining_queue
        ));
    }
    info!(
        "Crawl finished: fetched={} ok={} failed={} queued={}",
        summary.fetched,
        summary.succeeded,
        summary.failed(),
        summary.remaining_queue
    );

    Ok(summary)
}

async fn crawl_target<T, S>(
    fetcher: &Fetcher<T>,
    frontier: &mut Frontier<S>,
    target: &ValidTarget,
    summary: &mut CrawlSummary,
) -> Result<()>
where
    T: Transport,
    S: Storage,
{
    let node_info = match fetcher.fetch_nodeinfo(&target.base_url).await {
        Ok(node_info) => node_info,
        Err(FetchFailure { status, detail }) => {
            debug!("Node info of {} unavailable: {}", target.target, detail);

            let endpoint = &target.base_url;
            if frontier.is_endpoint_checked(endpoint) {
                summary.aliases_skipped += 1;
                return frontier.mark_targets_checked(std::slice::from_ref(target));
            }
            summary.count_failure(status);
            return frontier.register_stats(
                target,
                endpoint,
                StatsResult::Fail {
                    resource_status: status,
                    detail,
                },
            );
        }
    };
    debug!("Fetched the node info of {}", target.target);

    let endpoint = frontier.endpoint_by_resource_url(&node_info.resource_url);
    if frontier.is_endpoint_checked(&endpoint) {
        debug!("{} resolves to already checked {}", target.target, endpoint);
        summary.aliases_skipped += 1;
        return frontier.mark_targets_checked(std::slice::from_ref(target));
    }
    summary.succeeded += 1;

    let software_name = node_info.software_name.clone();
    let peers = match fetcher.fetch_peers(&endpoint, software_name.as_deref()).await {
        Ok(peers) => peers,
        Err(failure) => {
            warn!("Failed to fetch peers of {}: {}", endpoint, failure.detail);
            summary.peers_failed += 1;
            return frontier.register_stats(
                target,
                &endpoint,
                StatsResult::Ok {
                    node_info,
                    peers_count: None,
                },
            );
        }
    };
    debug!("Fetched {} peers of {}", peers.hosts.len(), endpoint);

    frontier.register_stats(
        target,
        &endpoint,
        StatsResult::Ok {
            node_info,
            peers_count: Some(peers.hosts.len()),
        },
    )?;
    summary.peers_discovered += peers.hosts.len();

    let enqueued = frontier.enqueue_targets(&peers.hosts, Some(&endpoint))?;
    warn_flagged(&format!("The peers of {}", endpoint), &enqueued);
    summary.newly_queued += enqueued.queued;
    if enqueued.include_ng {
        summary.peer_lists_with_ng += 1;
    }
    if enqueued.include_invalid {
        summary.peer_lists_with_invalid += 1;
    }

    Ok(())
}

fn warn_flagged(subject: &str, result: &EnqueueResult) {
    if result.include_ng {
        warn!("{} include some NG peers.", subject);
    }
    if result.include_invalid {
        warn!("{} include some invalid peers.", subject);
    }
}

/// Generate a crawl report from a summary
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Targets fetched: {}\n", summary.fetched));
    report.push_str(&format!("  Node info found: {}\n", summary.succeeded));
    report.push_str(&format!("  Failed: {}\n", summary.failed()));
    report.push_str(&format!("    gone: {}\n", summary.gone));
    report.push_str(&format!("    not-supported: {}\n", summary.not_supported));
    report.push_str(&format!("    unknown: {}\n", summary.unknown));
    report.push_str(&format!("  Aliases skipped: {}\n", summary.aliases_skipped));

    report.push_str("\n# Peers:\n");
    report.push_str(&format!("  Peers discovered: {}\n", summary.peers_discovered));
    report.push_str(&format!("  Newly queued: {}\n", summary.newly_queued));
    report.push_str(&format!("  Peer APIs failed: {}\n", summary.peers_failed));
    if summary.peer_lists_with_ng > 0 {
        report.push_str(&format!("  Lists with NG peers: {}\n", summary.peer_lists_with_ng));
    }
    if summary.peer_lists_with_invalid > 0 {
        report.push_str(&format!(
            "  Lists with invalid peers: {}\n",
            summary.peer_lists_with_invalid
        ));
    }

    report.push_str("\n# Frontier:\n");
    report.push_str(&format!("  Checked endpoints: {}\n", summary.checked_endpoints));
    report.push_str(&format!("  Still queued: {}\n", summary.remaining_queue));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}
