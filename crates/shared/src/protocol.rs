use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::RunId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStatus {
    pub active_id: RunId,
    pub current_speed: f64,
    pub total_iterations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
    pub total_iterations: u64,
    pub start_date: NaiveDateTime,
    pub sequence_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLinks {
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullStatusResponse {
    pub data: RunData,
    #[serde(default)]
    pub links: RunLinks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub total_iterations: u64,
    pub sequence_length: usize,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
}

impl From<FullStatusResponse> for RunStatistics {
    fn from(value: FullStatusResponse) -> Self {
        Self {
            start_date: value.data.start_date,
            end_date: value.data.end_date,
            total_iterations: value.data.total_iterations,
            sequence_length: value.data.sequence_length,
            previous_url: non_empty(value.links.previous),
            next_url: non_empty(value.links.next),
        }
    }
}

fn non_empty(link: Option<String>) -> Option<String> {
    link.filter(|url| !url.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
