use serde::{Deserialize, Serialize};
use serde_json::Number;
use url::Url;

/// NodeInfo schema versions this crawler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeInfoResourceType {
    #[serde(rename = "http://nodeinfo.diaspora.software/ns/schema/1.0")]
    V1_0,
    #[serde(rename = "http://nodeinfo.diaspora.software/ns/schema/2.0")]
    V2_0,
    #[serde(rename = "http://nodeinfo.diaspora.software/ns/schema/2.1")]
    V2_1,
}

impl NodeInfoResourceType {
    pub const ALL: [NodeInfoResourceType; 3] = [
        NodeInfoResourceType::V1_0,
        NodeInfoResourceType::V2_0,
        NodeInfoResourceType::V2_1,
    ];

    pub fn schema_uri(&self) -> &'static str {
        match self {
            NodeInfoResourceType::V1_0 => "http://nodeinfo.diaspora.software/ns/schema/1.0",
            NodeInfoResourceType::V2_0 => "http://nodeinfo.diaspora.software/ns/schema/2.0",
            NodeInfoResourceType::V2_1 => "http://nodeinfo.diaspora.software/ns/schema/2.1",
        }
    }

    /// Matches a `rel` value from the well-known document exactly.
    pub fn from_rel(rel: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.schema_uri() == rel)
    }
}

/// Metadata read from a server's NodeInfo document. Only `resource_type`
/// and `resource_url` are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub resource_type: NodeInfoResourceType,
    /// Final URL the document was served from.
    pub resource_url: Url,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_inbound: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_outbound: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_total: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_active_month: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_active_half_year: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_posts_total: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_comments_total: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_registrations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_required_for_signup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_hcaptcha: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_recaptcha: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_note_text_length: Option<Number>,
}

impl NodeInfo {
    pub fn new(resource_type: NodeInfoResourceType, resource_url: Url) -> Self {
        Self {
            resource_type,
            resource_url,
            node_name: None,
            protocols: None,
            services_inbound: None,
            services_outbound: None,
            software_name: None,
            software_version: None,
            software_repository: None,
            users_total: None,
            users_active_month: None,
            users_active_half_year: None,
            local_posts_total: None,
            local_comments_total: None,
            maintainer_name: None,
            open_registrations: None,
            email_required_for_signup: None,
            enable_email: None,
            enable_hcaptcha: None,
            enable_recaptcha: None,
            langs: None,
            max_note_text_length: None,
        }
    }
}

/// Hostnames a server reports federating with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peers {
    pub hosts: Vec<String>,
}
