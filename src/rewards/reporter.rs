use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::rewards::types::DAILY_KEY;
use crate::storage::Database;

pub const CATEGORY: &str = "Mailbox";
pub const MODULE: &str = "task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleResult {
    None,
    Ok,
    Error,
}

impl fmt::Display for CycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleResult::None => write!(f, "none"),
            CycleResult::Ok => write!(f, "ok"),
            CycleResult::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CycleResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CycleResult::None),
            "ok" => Ok(CycleResult::Ok),
            "error" => Ok(CycleResult::Error),
            other => Err(format!("unknown cycle result: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeFields {
    pub module: &'static str,
    pub event: &'static str,
    pub result: CycleResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// One structured record per check cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    pub category: &'static str,
    pub message: String,
    pub fields: OutcomeFields,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    fn new(result: CycleResult, message: String, count: Option<u32>, at: DateTime<Utc>) -> Self {
        Self {
            category: CATEGORY,
            message,
            fields: OutcomeFields {
                module: MODULE,
                event: DAILY_KEY,
                result,
                count,
            },
            recorded_at: at,
        }
    }

    pub fn nothing_to_claim(at: DateTime<Utc>) -> Self {
        Self::new(
            CycleResult::None,
            "No mailbox rewards to claim today".to_string(),
            None,
            at,
        )
    }

    pub fn all_attempts_failed(eligible: usize, at: DateTime<Utc>) -> Self {
        Self::new(
            CycleResult::None,
            format!("All claim attempts failed for {} mails, will retry", eligible),
            Some(0),
            at,
        )
    }

    pub fn claimed(count: u32, summary: &str, at: DateTime<Utc>) -> Self {
        let message = if summary.is_empty() {
            format!("Claimed {} mails", count)
        } else {
            format!("Claimed {} mails → {}", count, summary)
        };
        Self::new(CycleResult::Ok, message, Some(count), at)
    }

    pub fn failed(reason: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            CycleResult::Error,
            format!("Claiming mailbox rewards failed: {}", reason),
            None,
            at,
        )
    }
}

/// Fire-and-forget sink for cycle records
pub trait OutcomeReporter: Send + Sync {
    fn report(&self, record: &OutcomeRecord);
}

/// Emits each record as a single tracing event
pub struct TracingReporter;

impl OutcomeReporter for TracingReporter {
    fn report(&self, record: &OutcomeRecord) {
        let fields = &record.fields;
        match fields.result {
            CycleResult::Error => warn!(
                category = record.category,
                module = fields.module,
                event = fields.event,
                result = %fields.result,
                "{}",
                record.message
            ),
            _ => info!(
                category = record.category,
                module = fields.module,
                event = fields.event,
                result = %fields.result,
                count = fields.count,
                "{}",
                record.message
            ),
        }
    }
}

/// Appends each record to the cycle history table
pub struct HistoryReporter {
    db: Mutex<Database>,
}

impl HistoryReporter {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl OutcomeReporter for HistoryReporter {
    fn report(&self, record: &OutcomeRecord) {
        let db = match self.db.lock() {
            Ok(db) => db,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = db.save_cycle(record) {
            warn!("Failed to save cycle record: {}", e);
        }
    }
}

/// Forwards every record to each sink in turn
#[derive(Default)]
pub struct ReporterSet {
    sinks: Vec<Box<dyn OutcomeReporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl OutcomeReporter + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutcomeReporter for ReporterSet {
    fn report(&self, record: &OutcomeRecord) {
        for sink in &self.sinks {
            sink.report(record);
        }
    }
}
