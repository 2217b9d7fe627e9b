// Line shapes of the four append-only log files

use fedistats_scanner::{NodeInfo, ResourceStatus};
use serde::{Deserialize, Serialize};

/// One line of the queue file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLine {
    pub target: String,
    /// Endpoint whose peer list produced this target; absent for seeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_endpoint: Option<String>,
}

/// One line of the checked-targets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedLine {
    pub target: String,
}

/// One line of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceStats {
    pub endpoint: String,
    pub checked_target: String,
    pub result: StatsResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatsResult {
    Fail {
        resource_status: ResourceStatus,
        detail: String,
    },
    Ok {
        node_info: NodeInfo,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peers_count: Option<usize>,
    },
}
