use chrono::NaiveDateTime;
use serde::Serialize;

use super::state::Phase;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub phase: Phase,
    pub title: String,
    pub title_suffix: String,
    pub speed_label: String,
    pub total_iterations: Option<u64>,
    pub sequence_length: usize,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ViewModel {
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Sorted
    }
}
