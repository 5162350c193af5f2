use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;

/// Source of wall-clock time for gating decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Why a non-forced check did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    DoneToday,
    CoolingDown { remaining: Duration },
}

/// Calendar day of `at` in the reference zone, as `YYYY-MM-DD`
pub fn date_key(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

/// Daily-done marker and check throttle for one orchestrator
#[derive(Debug, Clone)]
pub struct GatingState {
    done_date_key: Option<String>,
    last_check_at: Option<DateTime<Utc>>,
    cooldown: Duration,
    offset: FixedOffset,
}

impl GatingState {
    pub fn new(cooldown: Duration, offset: FixedOffset) -> Self {
        Self {
            done_date_key: None,
            last_check_at: None,
            cooldown,
            offset,
        }
    }

    pub fn is_done_on(&self, now: DateTime<Utc>) -> bool {
        self.done_date_key.as_deref() == Some(date_key(now, self.offset).as_str())
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) {
        self.done_date_key = Some(date_key(now, self.offset));
    }

    pub fn last_check_at(&self) -> Option<DateTime<Utc>> {
        self.last_check_at
    }

    pub fn record_check(&mut self, now: DateTime<Utc>) {
        self.last_check_at = Some(now);
    }

    /// Decide whether a non-forced check may run at `now`. A clock that
    /// moved backwards counts as still inside the window.
    pub fn evaluate(&self, now: DateTime<Utc>) -> GateDecision {
        if self.is_done_on(now) {
            return GateDecision::DoneToday;
        }

        if let Some(last) = self.last_check_at {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                return GateDecision::CoolingDown {
                    remaining: self.cooldown - elapsed,
                };
            }
        }

        GateDecision::Proceed
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when told to
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn at(rfc3339: &str) -> Self {
            let now = DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc);
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::from_std(by).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
