use serde::{Deserialize, Serialize};

use super::Source;

/// Body posted to the show-status backend
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub show_name: String,
    #[serde(rename = "isTV")]
    pub is_tv: bool,
    /// Caller's date as `YYYY-MM-DD`
    pub current_date: String,
}

/// AI-generated status for a show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub summary: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default)]
    pub cached: Option<bool>,
}
