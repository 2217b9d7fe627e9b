pub mod crawl;
pub mod error;
pub mod frontier;
pub mod records;
pub mod storage;
pub mod target;

pub use crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, execute_crawl, generate_crawl_report};
pub use error::FrontierError;
pub use frontier::{EnqueueResult, Frontier, FrontierPaths};
pub use records::{CheckedLine, InstanceStats, QueueLine, StatsResult};
pub use storage::{FsStorage, Storage};
pub use target::{NgFilter, ValidTarget, endpoint_by_resource_url, validate_target};
