use fedistats::handlers::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_default_paths_follow_result_file() {
    let args = CrawlArgs::default();
    let paths = resolve_paths(&args);

    assert_eq!(paths.result_file, PathBuf::from("fediverse-stats.txt"));
    assert_eq!(paths.queue_file, PathBuf::from("fediverse-stats.txt.queue"));
    assert_eq!(paths.checked_file, PathBuf::from("fediverse-stats.txt.checked"));
    assert_eq!(paths.ng_list_file, PathBuf::from("fediverse-stats.txt.ng-list"));
}

#[test]
fn test_default_fetch_settings() {
    let args = CrawlArgs::default();

    assert_eq!(args.fetch_timeout_sec, 3);
    assert_eq!(args.fetch_limit, None);
    assert!(!args.quiet);
    assert!(!args.verbose);
}

#[test]
fn test_explicit_paths_override_defaults() {
    let args = CrawlArgs {
        result_file: "out/stats.txt".to_string(),
        queue_file: Some("state/pending".to_string()),
        ng_list_file: Some("rules.ndjson".to_string()),
        ..CrawlArgs::default()
    };
    let paths = resolve_paths(&args);

    assert_eq!(paths.result_file, PathBuf::from("out/stats.txt"));
    assert_eq!(paths.queue_file, PathBuf::from("state/pending"));
    assert_eq!(paths.checked_file, PathBuf::from("out/stats.txt.checked"));
    assert_eq!(paths.ng_list_file, PathBuf::from("rules.ndjson"));
}

#[test]
fn test_tilde_is_expanded() {
    let args = CrawlArgs {
        result_file: "~/fediverse-stats.txt".to_string(),
        ..CrawlArgs::default()
    };
    let paths = resolve_paths(&args);

    assert!(!paths.result_file.starts_with("~"));
    assert!(paths.result_file.ends_with("fediverse-stats.txt"));
}

#[test]
fn test_load_hosts_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "mastodon.example")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "# lemmy instances")?;
    writeln!(temp_file, "  lemmy.example:8443  ")?;

    let hosts = load_hosts_from_file(temp_file.path())?;

    assert_eq!(hosts, vec!["mastodon.example", "lemmy.example:8443"]);
    Ok(())
}

#[test]
fn test_load_hosts_from_missing_file() {
    let result = load_hosts_from_file(&PathBuf::from("/nonexistent/hosts.txt"));
    assert!(result.is_err());
}

#[test]
fn test_collect_seeds_combines_sources() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "b.example")?;

    let args = CrawlArgs {
        hosts: vec!["a.example".to_string()],
        hosts_file: Some(temp_file.path().to_path_buf()),
        ..CrawlArgs::default()
    };

    assert_eq!(collect_seeds(&args)?, vec!["a.example", "b.example"]);
    Ok(())
}

#[test]
fn test_collect_seeds_requires_a_host() -> Result<(), Box<dyn std::error::Error>> {
    let temp_file = NamedTempFile::new()?;
    let args = CrawlArgs {
        hosts_file: Some(temp_file.path().to_path_buf()),
        ..CrawlArgs::default()
    };

    assert!(collect_seeds(&args).is_err());
    Ok(())
}

#[test]
fn test_log_writer_passes_lines_through_while_spinner_is_active() {
    let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
    let spinner = progress.add(ProgressBar::new_spinner());
    spinner.set_message("fetch a.example");

    let mut writer = ProgressAwareStderr::new(progress.clone());
    let line = b"WARN The peers of https://a.example/ include some NG peers.\n";

    assert_eq!(writer.write(line).unwrap(), line.len());
    writer.flush().unwrap();
    assert!(!spinner.is_finished());
}
