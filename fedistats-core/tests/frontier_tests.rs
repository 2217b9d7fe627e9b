// Tests for the persistent frontier

use fedistats_core::frontier::{Frontier, FrontierPaths};
use fedistats_core::records::{QueueLine, StatsResult};
use fedistats_core::storage::{FsStorage, Storage};
use fedistats_core::target::validate_target;
use fedistats_core::FrontierError;
use fedistats_scanner::{NodeInfo, NodeInfoResourceType, ResourceStatus};
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;

fn create_test_paths() -> (TempDir, FrontierPaths) {
    let temp_dir = TempDir::new().unwrap();
    let paths = FrontierPaths::from_result_file(temp_dir.path().join("stats.txt"));
    (temp_dir, paths)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn backup_of(path: &Path) -> PathBuf {
    with_suffix(path, ".backup")
}

/// Local storage whose n-th append fails, as if the process died there.
struct FailingAppendStorage {
    appends: Cell<usize>,
    fail_on: usize,
}

impl FailingAppendStorage {
    fn new(fail_on: usize) -> Self {
        Self {
            appends: Cell::new(0),
            fail_on,
        }
    }
}

impl Storage for FailingAppendStorage {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        FsStorage.exists(path)
    }

    fn create_empty(&self, path: &Path) -> io::Result<()> {
        FsStorage.create_empty(path)
    }

    fn append_lines(&self, path: &Path, lines: &[String]) -> io::Result<()> {
        let count = self.appends.get() + 1;
        self.appends.set(count);
        if count == self.fail_on {
            return Err(io::Error::other("disk full"));
        }
        FsStorage.append_lines(path, lines)
    }

    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        FsStorage.read_lines(path)
    }

    fn replace(&self, path: &Path, contents: &str) -> io::Result<()> {
        FsStorage.replace(path, contents)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        FsStorage.copy(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        FsStorage.rename(from, to)
    }
}

fn record_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn ok_result(resource_url: &str) -> StatsResult {
    StatsResult::Ok {
        node_info: NodeInfo::new(NodeInfoResourceType::V2_0, Url::parse(resource_url).unwrap()),
        peers_count: Some(0),
    }
}

fn drain(frontier: &mut Frontier) -> Vec<String> {
    let mut targets = Vec::new();
    while let Some(target) = frontier.dequeue_target() {
        targets.push(target.target);
    }
    targets
}

// ============================================================================
// Load Tests
// ============================================================================

#[test]
fn test_load_creates_missing_files() {
    let (_temp_dir, paths) = create_test_paths();

    let frontier = Frontier::open(paths.clone()).unwrap();

    for path in [&paths.result_file, &paths.queue_file, &paths.checked_file, &paths.ng_list_file] {
        assert!(path.exists(), "{} should exist", path.display());
        assert_eq!(fs::read_to_string(path).unwrap(), "");
        assert!(!backup_of(path).exists());
    }
    assert_eq!(frontier.queued_targets_count(), 0);
    assert_eq!(frontier.checked_endpoints_count(), 0);
}

#[test]
fn test_default_paths_are_relative_to_result_file() {
    let paths = FrontierPaths::from_result_file("out/fediverse-stats.txt");

    assert_eq!(paths.queue_file, PathBuf::from("out/fediverse-stats.txt.queue"));
    assert_eq!(paths.checked_file, PathBuf::from("out/fediverse-stats.txt.checked"));
    assert_eq!(paths.ng_list_file, PathBuf::from("out/fediverse-stats.txt.ng-list"));
}

#[test]
fn test_load_backs_up_existing_files() {
    let (_temp_dir, paths) = create_test_paths();
    let results = "{\"endpoint\":\"https://a.example/\",\"checked_target\":\"a.example\",\"result\":{\"type\":\"fail\",\"resource_status\":\"gone\",\"detail\":\"x\"}}\n";
    let queue = "{\"target\":\"b.example\"}\n{\"target\":\"b.example\"}\n";
    fs::write(&paths.result_file, results).unwrap();
    fs::write(&paths.queue_file, queue).unwrap();
    fs::write(&paths.checked_file, "{\"target\":\"a.example\"}\n").unwrap();
    fs::write(&paths.ng_list_file, "# no rules yet\n").unwrap();

    let _frontier = Frontier::open(paths.clone()).unwrap();

    assert_eq!(fs::read_to_string(backup_of(&paths.result_file)).unwrap(), results);
    assert_eq!(fs::read_to_string(backup_of(&paths.queue_file)).unwrap(), queue);
    assert_eq!(
        fs::read_to_string(backup_of(&paths.checked_file)).unwrap(),
        "{\"target\":\"a.example\"}\n"
    );
    assert_eq!(fs::read_to_string(backup_of(&paths.ng_list_file)).unwrap(), "# no rules yet\n");
    // Append-only logs are never rewritten.
    assert_eq!(fs::read_to_string(&paths.result_file).unwrap(), results);
}

#[test]
fn test_comments_blank_lines_and_truncated_final_line() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(
        &paths.queue_file,
        "# queue\n{\"target\":\"a.example\"}\n\n{\"target\":\"b.example\"}",
    )
    .unwrap();

    let mut frontier = Frontier::open(paths).unwrap();

    assert_eq!(drain(&mut frontier), vec!["a.example", "b.example"]);
}

#[test]
fn test_malformed_line_is_fatal() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(&paths.checked_file, "# header\n{\"target\":\"a.example\"}\nnot json\n").unwrap();

    let err = Frontier::open(paths.clone()).err().unwrap();

    match err {
        FrontierError::MalformedLine { path, line, .. } => {
            assert_eq!(path, paths.checked_file);
            assert_eq!(line, 3);
        }
        other => panic!("expected MalformedLine, got {other:?}"),
    }
}

#[test]
fn test_results_replay_marks_endpoint_and_target() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(
        &paths.result_file,
        "{\"endpoint\":\"https://a.example/\",\"checked_target\":\"alias.example\",\"result\":{\"type\":\"fail\",\"resource_status\":\"not-supported\",\"detail\":\"x\"}}\n",
    )
    .unwrap();

    let mut frontier = Frontier::open(paths).unwrap();

    assert!(frontier.is_endpoint_checked(&Url::parse("https://a.example/").unwrap()));
    assert!(frontier.is_target_checked("alias.example"));
    let result = frontier.enqueue_targets(["alias.example"], None).unwrap();
    assert_eq!(result.queued, 0);
}

#[test]
fn test_queue_rewrite_dedups_and_filters() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(&paths.ng_list_file, "{\"type\":\"subdomain\",\"main_domain\":\"spam.example\"}\n").unwrap();

    let mut queue = String::new();
    for i in 0..600 {
        queue.push_str(&format!("{{\"target\":\"host{i}.example\"}}\n"));
    }
    for i in 0..100 {
        queue.push_str(&format!("{{\"target\":\"host{i}.example\",\"from_endpoint\":\"https://x.example/\"}}\n"));
    }
    queue.push_str("{\"target\":\"bot.spam.example\"}\n");
    queue.push_str("{\"target\":\"bad host\"}\n");
    fs::write(&paths.queue_file, &queue).unwrap();

    let mut frontier = Frontier::open(paths.clone()).unwrap();

    let rewritten = record_lines(&paths.queue_file);
    assert_eq!(rewritten.len(), 600);
    let first: QueueLine = serde_json::from_str(&rewritten[0]).unwrap();
    assert_eq!(first.target, "host0.example");
    assert_eq!(first.from_endpoint, None);
    let last: QueueLine = serde_json::from_str(&rewritten[599]).unwrap();
    assert_eq!(last.target, "host599.example");

    assert_eq!(fs::read_to_string(backup_of(&paths.queue_file)).unwrap(), queue);
    assert!(!with_suffix(&paths.queue_file, ".unify").exists());
    assert_eq!(frontier.queued_targets_count(), 600);
    assert_eq!(drain(&mut frontier).len(), 600);
}

#[test]
fn test_interrupted_queue_rewrite_keeps_every_target() {
    let (_temp_dir, paths) = create_test_paths();
    let mut queue = String::new();
    for i in 0..600 {
        queue.push_str(&format!("{{\"target\":\"host{i}.example\"}}\n"));
    }
    fs::write(&paths.queue_file, &queue).unwrap();

    // The first batch of 512 lands, the remaining 88 never do.
    let result = Frontier::load(FailingAppendStorage::new(2), paths.clone());
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&paths.queue_file).unwrap(), queue);

    let mut frontier = Frontier::open(paths.clone()).unwrap();

    assert_eq!(frontier.queued_targets_count(), 600);
    assert_eq!(fs::read_to_string(backup_of(&paths.queue_file)).unwrap(), queue);
    assert_eq!(record_lines(&paths.queue_file).len(), 600);
    assert_eq!(drain(&mut frontier).len(), 600);
}

#[test]
fn test_queue_replay_skips_checked_targets() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(&paths.queue_file, "{\"target\":\"a.example\"}\n{\"target\":\"b.example\"}\n").unwrap();
    fs::write(&paths.checked_file, "{\"target\":\"a.example\"}\n").unwrap();

    let mut frontier = Frontier::open(paths).unwrap();

    assert_eq!(frontier.queued_targets_count(), 1);
    assert_eq!(drain(&mut frontier), vec!["b.example"]);
}

#[test]
fn test_unknown_ng_rules_are_ignored() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(
        &paths.ng_list_file,
        "{\"type\":\"regex\",\"pattern\":\".*\"}\n{\"type\":\"subdomain\",\"main_domain\":\"example.com\"}\n",
    )
    .unwrap();

    let mut frontier = Frontier::open(paths).unwrap();

    assert_eq!(frontier.ng_filters().len(), 2);
    let result = frontier
        .enqueue_targets(["a.example", "x.example.com"], None)
        .unwrap();
    assert!(result.include_ng);
    assert_eq!(result.queued, 1);
}

// ============================================================================
// Enqueue / Dequeue Tests
// ============================================================================

#[test]
fn test_enqueue_is_idempotent_within_a_call() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();

    let result = frontier
        .enqueue_targets(["a.example", "a.example"], None)
        .unwrap();

    assert_eq!(result.queued, 1);
    assert_eq!(record_lines(&paths.queue_file).len(), 1);
    assert_eq!(drain(&mut frontier), vec!["a.example"]);
}

#[test]
fn test_enqueue_is_idempotent_across_calls_and_restarts() {
    let (_temp_dir, paths) = create_test_paths();

    {
        let mut frontier = Frontier::open(paths.clone()).unwrap();
        assert_eq!(frontier.enqueue_targets(["a.example"], None).unwrap().queued, 1);
        assert_eq!(frontier.enqueue_targets(["a.example"], None).unwrap().queued, 0);
    }

    let mut frontier = Frontier::open(paths.clone()).unwrap();
    assert_eq!(frontier.enqueue_targets(["a.example"], None).unwrap().queued, 0);

    assert_eq!(record_lines(&paths.queue_file).len(), 1);
    assert_eq!(frontier.queued_targets_count(), 1);
}

#[test]
fn test_enqueue_keeps_order_and_provenance() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();
    let from = Url::parse("https://hub.example/").unwrap();

    frontier
        .enqueue_targets(["c.example", "a.example", "b.example"], Some(&from))
        .unwrap();

    let lines: Vec<QueueLine> = record_lines(&paths.queue_file)
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.from_endpoint.as_deref() == Some("https://hub.example/")));
    assert_eq!(drain(&mut frontier), vec!["c.example", "a.example", "b.example"]);
}

#[test]
fn test_seed_lines_omit_from_endpoint() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();

    frontier.enqueue_targets(["a.example"], None).unwrap();

    assert_eq!(record_lines(&paths.queue_file), vec!["{\"target\":\"a.example\"}"]);
}

#[test]
fn test_invalid_targets_are_counted_not_queued() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();

    let result = frontier
        .enqueue_targets(["bad host", "ok.example"], None)
        .unwrap();

    assert!(result.include_invalid);
    assert!(!result.include_ng);
    assert_eq!(result.queued, 1);
    assert_eq!(drain(&mut frontier), vec!["ok.example"]);
}

#[test]
fn test_excluded_subdomains_are_dropped() {
    let (_temp_dir, paths) = create_test_paths();
    fs::write(&paths.ng_list_file, "{\"type\":\"subdomain\",\"main_domain\":\"example.com\"}\n").unwrap();
    let mut frontier = Frontier::open(paths).unwrap();

    let result = frontier
        .enqueue_targets(["spam.example.com", "example.com", "notexample.com"], None)
        .unwrap();

    assert!(result.include_ng);
    assert!(!result.include_invalid);
    assert_eq!(drain(&mut frontier), vec!["example.com", "notexample.com"]);
}

#[test]
fn test_dequeue_on_empty_queue() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths).unwrap();

    assert!(frontier.dequeue_target().is_none());
}

#[test]
fn test_dequeue_discards_targets_checked_after_enqueue() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths).unwrap();
    frontier.enqueue_targets(["a.example", "b.example"], None).unwrap();

    let b = validate_target("b.example").unwrap();
    frontier.mark_targets_checked(&[b]).unwrap();

    assert_eq!(drain(&mut frontier), vec!["a.example"]);
}

// ============================================================================
// Register Tests
// ============================================================================

#[test]
fn test_checked_supersedes_queued() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();
    frontier.enqueue_targets(["a.example"], None).unwrap();

    let target = frontier.dequeue_target().unwrap();
    let endpoint = target.base_url.clone();
    frontier
        .register_stats(&target, &endpoint, ok_result("https://a.example/nodeinfo/2.0"))
        .unwrap();

    assert_eq!(frontier.enqueue_targets(["a.example"], None).unwrap().queued, 0);
    assert!(frontier.dequeue_target().is_none());
    drop(frontier);

    let mut reloaded = Frontier::open(paths.clone()).unwrap();
    assert!(reloaded.is_endpoint_checked(&endpoint));
    assert_eq!(reloaded.enqueue_targets(["a.example"], None).unwrap().queued, 0);
    assert!(reloaded.dequeue_target().is_none());
    assert_eq!(record_lines(&paths.checked_file), vec!["{\"target\":\"a.example\"}"]);
}

#[test]
fn test_register_stats_writes_one_record() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();
    let target = validate_target("a.example").unwrap();
    let endpoint = Url::parse("https://a.example/").unwrap();

    frontier
        .register_stats(
            &target,
            &endpoint,
            StatsResult::Fail {
                resource_status: ResourceStatus::Gone,
                detail: "Failed to fetch https://a.example/.well-known/nodeinfo: the resource is gone.".to_string(),
            },
        )
        .unwrap();

    let lines = record_lines(&paths.result_file);
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["endpoint"], "https://a.example/");
    assert_eq!(value["checked_target"], "a.example");
    assert_eq!(value["result"]["type"], "fail");
    assert_eq!(value["result"]["resource_status"], "gone");
}

#[test]
fn test_mark_targets_checked_appends_once() {
    let (_temp_dir, paths) = create_test_paths();
    let mut frontier = Frontier::open(paths.clone()).unwrap();
    let target = validate_target("a.example").unwrap();

    frontier
        .mark_targets_checked(&[target.clone(), target.clone()])
        .unwrap();
    frontier.mark_targets_checked(&[target]).unwrap();

    assert_eq!(record_lines(&paths.checked_file).len(), 1);
}

#[test]
fn test_round_trip_reconstructs_checked_endpoints() {
    let (_temp_dir, paths) = create_test_paths();
    let hosts = ["a.example", "b.example", "c.example:8443"];
    let endpoints: Vec<Url> = hosts
        .iter()
        .map(|h| validate_target(h).unwrap().base_url)
        .collect();

    {
        let mut frontier = Frontier::open(paths.clone()).unwrap();
        frontier.enqueue_targets(hosts, None).unwrap();
        while let Some(target) = frontier.dequeue_target() {
            let resource_url = target.base_url.join("/nodeinfo/2.0").unwrap();
            let endpoint = frontier.endpoint_by_resource_url(&resource_url);
            frontier
                .register_stats(&target, &endpoint, ok_result(resource_url.as_str()))
                .unwrap();
        }
        assert_eq!(frontier.checked_endpoints_count(), 3);
    }

    let mut frontier = Frontier::open(paths).unwrap();

    assert_eq!(frontier.checked_endpoints_count(), 3);
    for endpoint in &endpoints {
        assert!(frontier.is_endpoint_checked(endpoint), "{endpoint} should be checked");
    }
    assert_eq!(frontier.queued_targets_count(), 0);
    assert!(frontier.dequeue_target().is_none());
}

#[test]
fn test_endpoint_by_resource_url() {
    let (_temp_dir, paths) = create_test_paths();
    let frontier = Frontier::open(paths).unwrap();

    let url = Url::parse("https://social.example:8443/nodeinfo/2.1?x=y#frag").unwrap();
    assert_eq!(
        frontier.endpoint_by_resource_url(&url).as_str(),
        "https://social.example:8443/"
    );
}
