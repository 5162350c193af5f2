use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rewards::reporter::CycleResult;

/// A reported claim cycle as stored in the history table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub event: String,
    pub result: CycleResult,
    pub claimed: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStats {
    pub total_cycles: usize,
    pub ok_cycles: usize,
    pub empty_cycles: usize,
    pub error_cycles: usize,
    pub total_claimed: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl HistoryStats {
    /// Share of cycles that claimed something, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_cycles == 0 {
            0.0
        } else {
            (self.ok_cycles as f64 / self.total_cycles as f64) * 100.0
        }
    }
}
