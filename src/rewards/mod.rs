pub mod client;
pub mod eligibility;
pub mod gating;
pub mod orchestrator;
pub mod reporter;
pub mod summary;
pub mod types;

pub use client::{ClaimApi, ClaimClient};
pub use gating::{Clock, GatingState, SystemClock};
pub use orchestrator::ClaimOrchestrator;
pub use reporter::{HistoryReporter, OutcomeRecord, OutcomeReporter, ReporterSet, TracingReporter};
pub use types::{CheckOutcome, ClaimableItem, DailyStatus, RewardLineItem, SourceId};
