// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{
    CrawlArgs, ProgressAwareStderr, collect_seeds, handle_crawl, init_tracing,
    load_hosts_from_file, resolve_paths,
};

// Re-export crawl functionality from fedistats-core
pub use fedistats_core::crawl::{CrawlOptions, CrawlSummary, execute_crawl, generate_crawl_report};
