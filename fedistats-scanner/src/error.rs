use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client setup failed: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a resource could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceStatus {
    /// The server answered 410; the resource is permanently removed.
    Gone,
    /// The server does not expose a recognized protocol or shape here.
    NotSupported,
    /// Transport failure or an unexpected status.
    Unknown,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Gone => "gone",
            ResourceStatus::NotSupported => "not-supported",
            ResourceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure half of a [`FetchResult`]. Always a value, never a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {detail}")]
pub struct FetchFailure {
    pub status: ResourceStatus,
    pub detail: String,
}

impl FetchFailure {
    pub fn new(status: ResourceStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn gone(detail: impl Into<String>) -> Self {
        Self::new(ResourceStatus::Gone, detail)
    }

    pub fn not_supported(detail: impl Into<String>) -> Self {
        Self::new(ResourceStatus::NotSupported, detail)
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ResourceStatus::Unknown, detail)
    }
}

/// Uniform outcome of every network operation in this crate.
pub type FetchResult<T> = std::result::Result<T, FetchFailure>;
