//! List and pagination defaults applied by every store.

use serde::{Deserialize, Serialize};

/// Listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Limit used when a request does not name one.
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Requests above this limit are clamped to it.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
    /// Page size used by `list_each` when the request does not name one.
    #[serde(default = "default_each_page_size")]
    pub each_page_size: u64,
    /// Reject conditions on unregistered fields instead of dropping them.
    #[serde(default)]
    pub reject_unknown_filters: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            each_page_size: default_each_page_size(),
            reject_unknown_filters: false,
        }
    }
}

fn default_limit() -> u64 {
    25
}

fn default_max_limit() -> u64 {
    100
}

fn default_each_page_size() -> u64 {
    100
}
