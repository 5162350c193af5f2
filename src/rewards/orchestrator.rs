use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::Result,
    rewards::{
        client::ClaimApi,
        eligibility::MergedSet,
        gating::{Clock, GateDecision, GatingState},
        reporter::{OutcomeRecord, OutcomeReporter},
        summary::summarize,
        types::{CheckOutcome, ClaimableItem, DailyStatus, RewardLineItem, SourceId, DAILY_KEY},
    },
};

/// Running totals of one claim cycle
#[derive(Debug, Default)]
struct ClaimTally {
    claimed: u32,
    rewards: Vec<RewardLineItem>,
}

impl ClaimTally {
    fn record(&mut self, granted: Vec<RewardLineItem>) {
        self.claimed += 1;
        self.rewards.extend(granted);
    }
}

/// Decides when to check the reward mailbox, claims what is there and
/// remembers when the day's work is done.
///
/// Gating state lives in the instance and `check_and_claim` takes
/// `&mut self`, so one orchestrator serves one process and its callers
/// are serialized.
pub struct ClaimOrchestrator<C: ClaimApi + 'static> {
    api: Arc<C>,
    sources: Vec<SourceId>,
    primary: SourceId,
    gating: GatingState,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn OutcomeReporter>,
}

impl<C: ClaimApi + 'static> ClaimOrchestrator<C> {
    pub fn new(
        api: Arc<C>,
        sources: Vec<SourceId>,
        primary: SourceId,
        gating: GatingState,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn OutcomeReporter>,
    ) -> Self {
        Self {
            api,
            sources,
            primary,
            gating,
            clock,
            reporter,
        }
    }

    pub fn from_config(
        api: Arc<C>,
        config: &Config,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn OutcomeReporter>,
    ) -> anyhow::Result<Self> {
        let gating = GatingState::new(config.cooldown(), config.reference_offset()?);
        Ok(Self::new(
            api,
            config.sources(),
            config.primary_source(),
            gating,
            clock,
            reporter,
        ))
    }

    pub fn status(&self) -> DailyStatus {
        DailyStatus {
            key: DAILY_KEY,
            done_today: self.gating.is_done_on(self.clock.now()),
            last_check_at: self.gating.last_check_at(),
        }
    }

    /// Check every source and claim whatever is eligible.
    ///
    /// Unless `force` is set, nothing happens once today is marked done or
    /// while the cooldown since the previous attempt is running. Failures
    /// never reach the caller; they show up in the reported record and a
    /// zero outcome.
    pub async fn check_and_claim(&mut self, force: bool) -> CheckOutcome {
        let now = self.clock.now();

        if !force {
            match self.gating.evaluate(now) {
                GateDecision::Proceed => {}
                GateDecision::DoneToday => {
                    debug!("Mailbox rewards already done today");
                    return CheckOutcome::ZERO;
                }
                GateDecision::CoolingDown { remaining } => {
                    debug!(remaining_secs = remaining.as_secs(), "Mailbox check cooling down");
                    return CheckOutcome::ZERO;
                }
            }
        }

        self.gating.record_check(now);

        match self.run_cycle().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.reporter
                    .report(&OutcomeRecord::failed(&e.to_string(), self.clock.now()));
                CheckOutcome::ZERO
            }
        }
    }

    async fn run_cycle(&mut self) -> Result<CheckOutcome> {
        let merged = self.fetch_merged().await?;
        let eligible: Vec<ClaimableItem> = merged.eligible().into_iter().cloned().collect();

        if eligible.is_empty() {
            self.gating.mark_done(self.clock.now());
            self.reporter
                .report(&OutcomeRecord::nothing_to_claim(self.clock.now()));
            return Ok(CheckOutcome::ZERO);
        }

        info!(
            visible = merged.len(),
            eligible = eligible.len(),
            "Claiming mailbox rewards"
        );

        let mut tally = ClaimTally::default();
        self.try_batch(&eligible[0].id, &mut tally).await;
        self.sweep(&eligible, &mut tally).await;

        if tally.claimed == 0 {
            self.reporter.report(&OutcomeRecord::all_attempts_failed(
                eligible.len(),
                self.clock.now(),
            ));
            return Ok(CheckOutcome::ZERO);
        }

        let summary = summarize(&tally.rewards);
        self.reporter
            .report(&OutcomeRecord::claimed(tally.claimed, &summary, self.clock.now()));
        self.gating.mark_done(self.clock.now());

        Ok(CheckOutcome {
            claimed: tally.claimed,
            reward_items: tally.rewards.len(),
        })
    }

    /// Query all sources concurrently and merge them in priority order.
    /// A source that fails to answer contributes nothing.
    async fn fetch_merged(&self) -> Result<MergedSet> {
        let handles = self.sources.iter().map(|&source| {
            let api = Arc::clone(&self.api);
            tokio::spawn(async move { api.list_claimable(source).await })
        });
        let replies = join_all(handles).await;

        let mut lists = Vec::with_capacity(replies.len());
        for (&source, reply) in self.sources.iter().zip(replies) {
            match reply? {
                Ok(items) => lists.push(items),
                Err(e) => {
                    warn!(%source, "Listing mailbox failed, treating as empty: {}", e);
                    lists.push(Vec::new());
                }
            }
        }

        Ok(MergedSet::from_sources(lists))
    }

    /// Batch claim on behalf of `representative`. Counts once on success;
    /// a failure leaves the tally untouched.
    async fn try_batch(&self, representative: &str, tally: &mut ClaimTally) {
        match self.api.claim_batch(self.primary, representative).await {
            Ok(granted) => {
                debug!(representative, granted = granted.len(), "Batch claim succeeded");
                tally.record(granted);
            }
            Err(e) => debug!(representative, "Batch claim failed: {}", e),
        }
    }

    /// Claim every eligible item one by one, the batch representative
    /// included. Each failure is isolated to its own item.
    async fn sweep(&self, eligible: &[ClaimableItem], tally: &mut ClaimTally) {
        for item in eligible {
            match self.api.claim_one(self.primary, &item.id).await {
                Ok(granted) => tally.record(granted),
                Err(e) => debug!(id = %item.id, "Claim failed: {}", e),
            }
        }
    }
}
