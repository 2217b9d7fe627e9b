//! Durable crawl state.
//!
//! The frontier owns four newline-delimited JSON logs:
//!
//! ```text
//! results   InstanceStats per processed target   (append-only)
//! queue     QueueLine per enqueued target        (append-only, compacted on load)
//! checked   CheckedLine per finished target      (append-only)
//! ng-list   NgFilter exclusion rules             (read-only)
//! ```
//!
//! On load every existing log is copied to `<file>.backup` before anything
//! touches it, then replayed into memory. The queue log is the only file
//! ever rewritten, and only from its backup into a sibling file that is
//! then renamed over it.
//!
//! Two identities are tracked. The queue dedups by the raw target string,
//! while the checked set is keyed by the canonical endpoint the fetcher
//! resolved, so aliases of one server are only measured once.

use crate::error::{FrontierError, Result};
use crate::records::{CheckedLine, InstanceStats, QueueLine, StatsResult};
use crate::storage::{FsStorage, Storage, sibling_path};
use crate::target::{NgFilter, ValidTarget, endpoint_by_resource_url, is_ng_target, validate_target};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Rewritten queue lines are flushed in batches of this size.
const QUEUE_REWRITE_BATCH: usize = 512;

/// Locations of the four logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierPaths {
    pub result_file: PathBuf,
    pub queue_file: PathBuf,
    pub checked_file: PathBuf,
    pub ng_list_file: PathBuf,
}

impl FrontierPaths {
    /// Derive the other three paths from the results file:
    /// `<result>.queue`, `<result>.checked` and `<result>.ng-list`.
    pub fn from_result_file(result_file: impl Into<PathBuf>) -> Self {
        let result_file = result_file.into();
        Self {
            queue_file: sibling_path(&result_file, ".queue"),
            checked_file: sibling_path(&result_file, ".checked"),
            ng_list_file: sibling_path(&result_file, ".ng-list"),
            result_file,
        }
    }
}

/// What `enqueue_targets` dropped or added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueResult {
    pub include_ng: bool,
    pub include_invalid: bool,
    pub queued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetMark {
    Queued,
    Checked,
}

pub struct Frontier<S = FsStorage> {
    storage: S,
    paths: FrontierPaths,
    queue: VecDeque<QueueLine>,
    marks: HashMap<String, TargetMark>,
    checked_endpoints: HashSet<String>,
    ng_list: Vec<NgFilter>,
}

impl Frontier<FsStorage> {
    pub fn open(paths: FrontierPaths) -> Result<Self> {
        Self::load(FsStorage, paths)
    }
}

impl<S: Storage> Frontier<S> {
    /// Back up and replay all four logs, creating missing ones empty.
    pub fn load(storage: S, paths: FrontierPaths) -> Result<Self> {
        let mut frontier = Self {
            storage,
            paths,
            queue: VecDeque::new(),
            marks: HashMap::new(),
            checked_endpoints: HashSet::new(),
            ng_list: Vec::new(),
        };

        let result_file = frontier.paths.result_file.clone();
        frontier.backup_or_create(&result_file)?;
        for stats in frontier.load_json_lines::<InstanceStats>(&result_file)? {
            frontier.checked_endpoints.insert(stats.endpoint);
            frontier.marks.insert(stats.checked_target, TargetMark::Checked);
        }

        let ng_list_file = frontier.paths.ng_list_file.clone();
        frontier.backup_or_create(&ng_list_file)?;
        frontier.ng_list = frontier.load_json_lines::<NgFilter>(&ng_list_file)?;

        let checked_file = frontier.paths.checked_file.clone();
        frontier.backup_or_create(&checked_file)?;
        for line in frontier.load_json_lines::<CheckedLine>(&checked_file)? {
            frontier.marks.insert(line.target, TargetMark::Checked);
        }

        let queue_file = frontier.paths.queue_file.clone();
        if frontier.exists(&queue_file)? {
            frontier.backup_and_unify_queue_file(&queue_file)?;
        } else {
            frontier.create_empty(&queue_file)?;
        }
        for line in frontier.load_json_lines::<QueueLine>(&queue_file)? {
            if !frontier.marks.contains_key(&line.target) {
                frontier.marks.insert(line.target.clone(), TargetMark::Queued);
                frontier.queue.push_back(line);
            }
        }

        info!(
            "Loaded frontier: {} queued targets, {} checked endpoints, {} NG filters",
            frontier.queue.len(),
            frontier.checked_endpoints.len(),
            frontier.ng_list.len()
        );

        Ok(frontier)
    }

    /// Queue every valid, non-excluded target not seen before, in order.
    pub fn enqueue_targets<I>(&mut self, targets: I, from_endpoint: Option<&Url>) -> Result<EnqueueResult>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut result = EnqueueResult::default();
        let mut queue_lines = Vec::new();
        let mut queued = HashSet::new();

        for target in targets {
            let target = target.as_ref();
            let Some(valid_target) = validate_target(target) else {
                debug!("Dropping invalid target {:?}", target);
                result.include_invalid = true;
                continue;
            };

            if is_ng_target(&valid_target, &self.ng_list) {
                debug!("Dropping NG target {}", target);
                result.include_ng = true;
                continue;
            }

            if self.marks.contains_key(target) || !queued.insert(valid_target.target.clone()) {
                continue;
            }

            queue_lines.push(QueueLine {
                target: valid_target.target,
                from_endpoint: from_endpoint.map(Url::to_string),
            });
        }

        self.append_json_lines(&self.paths.queue_file, &queue_lines)?;

        result.queued = queue_lines.len();
        for line in queue_lines {
            self.marks.insert(line.target.clone(), TargetMark::Queued);
            self.queue.push_back(line);
        }

        Ok(result)
    }

    /// Next live target. Entries that no longer validate or were checked
    /// meanwhile are discarded.
    pub fn dequeue_target(&mut self) -> Option<ValidTarget> {
        while let Some(line) = self.queue.pop_front() {
            let Some(valid_target) = validate_target(&line.target) else {
                continue;
            };

            if self.marks.get(&line.target) == Some(&TargetMark::Checked) {
                continue;
            }

            if let Some(from) = &line.from_endpoint {
                debug!("Dequeued {} (discovered via {})", line.target, from);
            }
            return Some(valid_target);
        }
        None
    }

    /// Record the outcome for `target` and mark it and its endpoint checked.
    pub fn register_stats(&mut self, target: &ValidTarget, endpoint: &Url, result: StatsResult) -> Result<()> {
        let stats = InstanceStats {
            endpoint: endpoint.to_string(),
            checked_target: target.target.clone(),
            result,
        };
        self.append_json_lines(&self.paths.result_file, std::slice::from_ref(&stats))?;

        self.checked_endpoints.insert(stats.endpoint);
        self.mark_targets_checked(std::slice::from_ref(target))
    }

    /// Mark targets checked without a results record, e.g. aliases of an
    /// endpoint that was already measured.
    pub fn mark_targets_checked(&mut self, targets: &[ValidTarget]) -> Result<()> {
        let mut checked_lines = Vec::new();
        let mut seen = HashSet::new();
        for target in targets {
            if self.marks.get(&target.target) != Some(&TargetMark::Checked) && seen.insert(&target.target) {
                checked_lines.push(CheckedLine {
                    target: target.target.clone(),
                });
            }
        }

        self.append_json_lines(&self.paths.checked_file, &checked_lines)?;
        for line in checked_lines {
            self.marks.insert(line.target, TargetMark::Checked);
        }
        Ok(())
    }

    pub fn is_endpoint_checked(&self, endpoint: &Url) -> bool {
        self.checked_endpoints.contains(endpoint.as_str())
    }

    pub fn endpoint_by_resource_url(&self, url: &Url) -> Url {
        endpoint_by_resource_url(url)
    }

    pub fn is_target_checked(&self, target: &str) -> bool {
        self.marks.get(target) == Some(&TargetMark::Checked)
    }

    pub fn queued_targets_count(&self) -> usize {
        self.queue.len()
    }

    pub fn checked_endpoints_count(&self) -> usize {
        self.checked_endpoints.len()
    }

    pub fn ng_filters(&self) -> &[NgFilter] {
        &self.ng_list
    }

    /// Rebuild the queue file from its backup: first occurrence of each
    /// valid, non-excluded target, in order. The result is written to a
    /// sibling and renamed over the live file only once complete.
    fn backup_and_unify_queue_file(&self, queue_file: &Path) -> Result<()> {
        let backup = sibling_path(queue_file, ".backup");
        self.copy(queue_file, &backup)?;

        let lines = self.load_json_lines::<QueueLine>(&backup)?;
        let total = lines.len();

        let unified = sibling_path(queue_file, ".unify");
        self.storage
            .replace(&unified, "")
            .map_err(|e| FrontierError::io(&unified, e))?;

        let mut queued_targets = HashSet::new();
        let mut buffer = Vec::with_capacity(QUEUE_REWRITE_BATCH);
        for line in lines {
            if queued_targets.contains(&line.target) {
                continue;
            }

            let Some(valid_target) = validate_target(&line.target) else {
                continue;
            };

            if is_ng_target(&valid_target, &self.ng_list) {
                continue;
            }

            queued_targets.insert(valid_target.target);
            buffer.push(line);

            if buffer.len() >= QUEUE_REWRITE_BATCH {
                self.append_json_lines(&unified, &buffer)?;
                buffer.clear();
            }
        }
        self.append_json_lines(&unified, &buffer)?;

        self.storage
            .rename(&unified, queue_file)
            .map_err(|e| FrontierError::io(queue_file, e))?;

        debug!(
            "Unified {}: {} lines -> {} targets",
            queue_file.display(),
            total,
            queued_targets.len()
        );
        Ok(())
    }

    fn backup_or_create(&self, path: &Path) -> Result<()> {
        if self.exists(path)? {
            self.copy(path, &sibling_path(path, ".backup"))
        } else {
            self.create_empty(path)
        }
    }

    fn exists(&self, path: &Path) -> Result<bool> {
        self.storage.exists(path).map_err(|e| FrontierError::io(path, e))
    }

    fn create_empty(&self, path: &Path) -> Result<()> {
        self.storage.create_empty(path).map_err(|e| FrontierError::io(path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.storage.copy(from, to).map_err(|e| FrontierError::io(to, e))
    }

    fn append_json_lines<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.storage
            .append_lines(path, &lines)
            .map_err(|e| FrontierError::io(path, e))
    }

    /// Parse every record of a log. Blank lines and `#` comments are skipped.
    fn load_json_lines<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let lines = self
            .storage
            .read_lines(path)
            .map_err(|e| FrontierError::io(path, e))?;

        let mut records = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|source| FrontierError::MalformedLine {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
