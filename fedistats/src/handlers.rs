use anyhow::{Context, Result, bail};
use colored::Colorize;
use fedistats_core::{
    CrawlOptions, CrawlSummary, Frontier, FrontierPaths, execute_crawl, generate_crawl_report,
};
use fedistats_scanner::Fetcher;
use indicatif::MultiProgress;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

pub const DEFAULT_RESULT_FILE: &str = "fediverse-stats.txt";
pub const DEFAULT_FETCH_TIMEOUT_SEC: u64 = 3;

/// Settings for one crawl run, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlArgs {
    pub hosts: Vec<String>,
    pub hosts_file: Option<PathBuf>,
    pub result_file: String,
    pub queue_file: Option<String>,
    pub checked_file: Option<String>,
    pub ng_list_file: Option<String>,
    pub fetch_timeout_sec: u64,
    pub fetch_limit: Option<usize>,
    pub quiet: bool,
    pub verbose: bool,
}

impl Default for CrawlArgs {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            hosts_file: None,
            result_file: DEFAULT_RESULT_FILE.to_string(),
            queue_file: None,
            checked_file: None,
            ng_list_file: None,
            fetch_timeout_sec: DEFAULT_FETCH_TIMEOUT_SEC,
            fetch_limit: None,
            quiet: false,
            verbose: false,
        }
    }
}

// Helper functions for crawl handler

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Log locations: explicit flags win, the rest sit next to the results file.
pub fn resolve_paths(args: &CrawlArgs) -> FrontierPaths {
    let mut paths = FrontierPaths::from_result_file(expand_path(&args.result_file));
    if let Some(queue_file) = &args.queue_file {
        paths.queue_file = expand_path(queue_file);
    }
    if let Some(checked_file) = &args.checked_file {
        paths.checked_file = expand_path(checked_file);
    }
    if let Some(ng_list_file) = &args.ng_list_file {
        paths.ng_list_file = expand_path(ng_list_file);
    }
    paths
}

/// Load seed hosts from a file, one per line. Blank lines and `#`
/// comments are skipped.
pub fn load_hosts_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Positional hosts first, then those from `--hosts-file`.
pub fn collect_seeds(args: &CrawlArgs) -> Result<Vec<String>> {
    let mut seeds = args.hosts.clone();
    if let Some(hosts_file) = &args.hosts_file {
        seeds.extend(load_hosts_from_file(&expand_path(&hosts_file.to_string_lossy()))?);
    }

    if seeds.is_empty() {
        bail!("No seed hosts given");
    }
    Ok(seeds)
}

/// Stderr writer that hides the crawl spinner while a log line is written.
#[derive(Clone)]
pub struct ProgressAwareStderr {
    progress: MultiProgress,
}

impl ProgressAwareStderr {
    pub fn new(progress: MultiProgress) -> Self {
        Self { progress }
    }
}

impl Write for ProgressAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressAwareStderr {
    type Writer = ProgressAwareStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// `RUST_LOG` when set, otherwise `info` (`debug` with `--verbose`, `warn`
/// with `--quiet`). Logs go to stderr, above the spinner in `progress`.
pub fn init_tracing(verbose: bool, quiet: bool, progress: &MultiProgress) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let default = if quiet { "warn" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressAwareStderr::new(progress.clone()))
        .with_target(false)
        .try_init();
}

pub async fn handle_crawl(args: CrawlArgs, progress: MultiProgress) -> Result<CrawlSummary> {
    let seeds = collect_seeds(&args)?;
    let paths = resolve_paths(&args);
    info!(
        "Crawling from {} seed hosts into {}",
        seeds.len(),
        paths.result_file.display()
    );

    let fetcher = Fetcher::with_timeout_secs(args.fetch_timeout_sec)
        .context("Failed to build the HTTP client")?;
    let mut frontier = Frontier::open(paths).context("Failed to load the crawl state")?;

    let options = CrawlOptions {
        seeds,
        fetch_limit: args.fetch_limit,
        show_progress_bars: !args.quiet,
        multi_progress: Some(progress),
    };
    let summary = execute_crawl(options, &fetcher, &mut frontier, None)
        .await
        .context("Crawl aborted")?;

    if !args.quiet {
        println!("\n{} Crawl complete!\n", "✓".green());
        print!("{}", generate_crawl_report(&summary));
        if summary.remaining_queue > 0 {
            println!(
                "{}",
                format!(
                    "Run again to continue with the {} queued targets.",
                    summary.remaining_queue
                )
                .yellow()
            );
        }
    }

    Ok(summary)
}
