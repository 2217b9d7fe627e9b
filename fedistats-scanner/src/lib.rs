pub mod error;
pub mod fetcher;
pub mod json;
pub mod result;
pub mod transport;

pub use error::{FetchFailure, FetchResult, ResourceStatus, ScanError};
pub use fetcher::Fetcher;
pub use json::JsonExtractor;
pub use result::{NodeInfo, NodeInfoResourceType, Peers};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
