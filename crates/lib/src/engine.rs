use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::{fmt, sync::Arc, time::Duration};

use crate::{
    account::RecordRef,
    batch::{Batch, BatchPlanner},
    config::{Config, ConfirmationConfig},
    constant::{CONFIRMED_MESSAGE, EMPTY_SELECTION_MESSAGE, TIMED_OUT_MESSAGE},
    error::ReclaimError,
    notify::{Notifier, Severity},
    transaction::CloseTransactionBuilder,
    wallet::{ConfirmationStatus, SignatureStatusProvider, TransactionSubmitter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Planning,
    Submitting(usize),
    Polling(usize),
    Confirmed(usize),
    TimedOut(usize),
    Failed,
}

/// Terminal state of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Confirmed { signature: Signature, elapsed: Duration },
    TimedOut { signature: Signature, elapsed: Duration },
    Rejected { error: ReclaimError },
}

impl BatchOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            BatchOutcome::Confirmed { signature, .. } | BatchOutcome::TimedOut { signature, .. } => {
                Some(signature)
            }
            BatchOutcome::Rejected { .. } => None,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            BatchOutcome::Confirmed { .. } => OutcomeKind::Confirmed,
            BatchOutcome::TimedOut { .. } => OutcomeKind::TimedOut,
            BatchOutcome::Rejected { .. } => OutcomeKind::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Confirmed,
    TimedOut,
    Rejected,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Confirmed => f.write_str("confirmed"),
            OutcomeKind::TimedOut => f.write_str("timed-out"),
            OutcomeKind::Rejected => f.write_str("rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub index: usize,
    pub account_count: usize,
    pub lamports: u64,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    fn new(batch: &Batch, outcome: BatchOutcome) -> Self {
        Self {
            index: batch.index,
            account_count: batch.len(),
            lamports: batch.total_lamports(),
            outcome,
        }
    }
}

/// Per-batch outcomes of one closing run, in batch order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub batches: Vec<BatchReport>,
    pub planned_batches: usize,
    /// Error that ended the run before every batch was attempted
    pub aborted: Option<ReclaimError>,
    /// Set when the refresh that follows the run failed
    pub refresh_error: Option<ReclaimError>,
}

impl RunReport {
    pub fn confirmed_count(&self) -> usize {
        self.count(OutcomeKind::Confirmed)
    }

    pub fn timed_out_count(&self) -> usize {
        self.count(OutcomeKind::TimedOut)
    }

    /// Rent of the batches whose confirmation was observed
    pub fn confirmed_lamports(&self) -> u64 {
        self.batches
            .iter()
            .filter(|b| b.outcome.kind() == OutcomeKind::Confirmed)
            .map(|b| b.lamports)
            .sum()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    fn count(&self, kind: OutcomeKind) -> usize {
        self.batches.iter().filter(|b| b.outcome.kind() == kind).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed(Duration),
    TimedOut(Duration),
}

/// Submits planned batches one at a time and waits for each to confirm before the next.
pub struct CloseEngine {
    planner: BatchPlanner,
    builder: CloseTransactionBuilder,
    confirmation: ConfirmationConfig,
    submitter: Arc<dyn TransactionSubmitter>,
    status_provider: Arc<dyn SignatureStatusProvider>,
    notifier: Arc<dyn Notifier>,
    phase: RunPhase,
}

impl CloseEngine {
    pub fn new(
        planner: BatchPlanner,
        builder: CloseTransactionBuilder,
        confirmation: ConfirmationConfig,
        submitter: Arc<dyn TransactionSubmitter>,
        status_provider: Arc<dyn SignatureStatusProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            planner,
            builder,
            confirmation,
            submitter,
            status_provider,
            notifier,
            phase: RunPhase::Idle,
        }
    }

    pub fn from_config(
        config: &Config,
        submitter: Arc<dyn TransactionSubmitter>,
        status_provider: Arc<dyn SignatureStatusProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ReclaimError> {
        Ok(Self::new(
            BatchPlanner::from_config(config)?,
            CloseTransactionBuilder::from_config(config)?,
            config.confirmation.clone(),
            submitter,
            status_provider,
            notifier,
        ))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn planner(&self) -> &BatchPlanner {
        &self.planner
    }

    fn set_phase(&mut self, phase: RunPhase) {
        log::debug!("Close run phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Closes `records` on behalf of `wallet`.
    ///
    /// Empty input is a validation error and nothing is submitted. Otherwise every batch is
    /// attempted in order; a timed-out confirmation is reported and the run moves on, any
    /// other failure stops the run and is returned in [`RunReport::aborted`].
    pub async fn run(
        &mut self,
        wallet: &Pubkey,
        records: &[RecordRef],
    ) -> Result<RunReport, ReclaimError> {
        if records.is_empty() {
            self.notifier.notify(Severity::Error, EMPTY_SELECTION_MESSAGE, None);
            return Err(ReclaimError::ValidationError(EMPTY_SELECTION_MESSAGE.to_string()));
        }

        self.set_phase(RunPhase::Planning);
        let mut report = RunReport::default();

        let plan = match self.planner.plan(records) {
            Ok(plan) => plan,
            Err(e) => {
                self.abort(&mut report, e);
                return Ok(report);
            }
        };

        report.planned_batches = plan.len();
        log::info!(
            "Closing {} accounts in {} transactions for {wallet}",
            plan.total_records(),
            plan.len()
        );

        for batch in &plan {
            match self.execute_batch(batch, plan.len(), wallet).await {
                Ok(outcome) => report.batches.push(BatchReport::new(batch, outcome)),
                Err(e) => {
                    report
                        .batches
                        .push(BatchReport::new(batch, BatchOutcome::Rejected { error: e.clone() }));
                    self.abort(&mut report, e);
                    break;
                }
            }
        }

        self.set_phase(RunPhase::Idle);
        Ok(report)
    }

    fn abort(&mut self, report: &mut RunReport, error: ReclaimError) {
        log::error!("Close run aborted: {error}");
        self.notifier.notify(Severity::Error, &error.to_string(), None);
        report.aborted = Some(error);
        self.set_phase(RunPhase::Failed);
        self.set_phase(RunPhase::Idle);
    }

    async fn execute_batch(
        &mut self,
        batch: &Batch,
        total: usize,
        wallet: &Pubkey,
    ) -> Result<BatchOutcome, ReclaimError> {
        let transaction = self.builder.build(batch, wallet)?;

        self.notifier.notify(
            Severity::Info,
            &format!("Please confirm Tx: {}/{total}", batch.index + 1),
            None,
        );
        self.set_phase(RunPhase::Submitting(batch.index));
        let signature = self.submitter.sign_and_submit(transaction).await?;
        log::info!("Submitted transaction {}/{total}: {signature}", batch.index + 1);

        self.set_phase(RunPhase::Polling(batch.index));
        match self.poll_confirmation(&signature).await? {
            PollOutcome::Confirmed(elapsed) => {
                self.notifier.notify(Severity::Success, CONFIRMED_MESSAGE, Some(signature));
                self.set_phase(RunPhase::Confirmed(batch.index));
                Ok(BatchOutcome::Confirmed { signature, elapsed })
            }
            PollOutcome::TimedOut(elapsed) => {
                log::warn!(
                    "{}",
                    ReclaimError::ConfirmationTimeout(format!(
                        "{signature} not confirmed after {}",
                        humantime::format_duration(elapsed)
                    ))
                );
                self.notifier.notify(Severity::Error, TIMED_OUT_MESSAGE, Some(signature));
                self.set_phase(RunPhase::TimedOut(batch.index));
                Ok(BatchOutcome::TimedOut { signature, elapsed })
            }
        }
    }

    /// Queries the signature status every poll interval until it is confirmed or the
    /// accumulated interval steps reach the timeout. A confirmation seen on the k-th query
    /// reports `(k - 1) * interval` elapsed.
    pub async fn poll_confirmation(
        &self,
        signature: &Signature,
    ) -> Result<PollOutcome, ReclaimError> {
        let interval = self.confirmation.poll_interval();
        let timeout = self.confirmation.timeout();
        let mut elapsed = Duration::ZERO;

        loop {
            match self.status_provider.query_status(signature).await? {
                ConfirmationStatus::Confirmed => return Ok(PollOutcome::Confirmed(elapsed)),
                ConfirmationStatus::Pending | ConfirmationStatus::Unknown => {}
            }

            elapsed += interval;
            if elapsed >= timeout {
                return Ok(PollOutcome::TimedOut(elapsed));
            }
            tokio::time::sleep(interval).await;
        }
    }
}
