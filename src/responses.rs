//! Wire types shared by the upstream client and the HTTP surface.
//!
//! Field names follow the upstream API (camelCase), so the same structs are
//! used to decode upstream payloads and to serve our own responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioResponse {
    pub content: Vec<StudioInfo>,
}

/// A single studio as known by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioInfo {
    /// Public id used by our consumers
    pub id: u64,
    /// Id the upstream utilization endpoint is keyed by
    pub magicline_id: u64,
    pub name: String,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// Utilization payload for one studio.
///
/// Upstream only fills the time window and the data points; `uuid`, `name`
/// and `workload` are set by the store when the snapshot is enriched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationResponse {
    pub start_time: String,
    pub end_time: String,
    pub items: Vec<DataPoint>,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub workload: u8,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub start_time: String,
    pub end_time: String,
    pub is_current: bool,
    pub level: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Percentage of the data point flagged as current, if any.
pub fn current_workload(items: &[DataPoint]) -> Option<u8> {
    items
        .iter()
        .find(|point| point.is_current)
        .map(|point| point.percentage)
}
