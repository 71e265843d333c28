use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{
    account::lamports_to_sol,
    config::Network,
    engine::{OutcomeKind, RunReport},
    error::ReclaimError,
};

const THIRTY_DAYS: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// One CSV row per attempted batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: u64,
    pub date_utc: String,
    pub network: String,
    pub wallet: String,
    pub batch: usize,
    pub accounts: usize,
    pub lamports: u64,
    pub rent_sol: f64,
    pub outcome: String,
    pub signature: String,
}

/// Totals over the audit trail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditSummary {
    pub confirmed_transactions: usize,
    pub timed_out_transactions: usize,
    pub rejected_transactions: usize,
    pub accounts_closed: usize,
    pub reclaimed_lamports: u64,
    pub reclaimed_lamports_30d: u64,
}

impl AuditSummary {
    pub fn reclaimed_sol(&self) -> f64 {
        lamports_to_sol(self.reclaimed_lamports)
    }

    pub fn reclaimed_sol_30d(&self) -> f64 {
        lamports_to_sol(self.reclaimed_lamports_30d)
    }
}

/// Append-only CSV trail of close runs
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_for(
        report: &RunReport,
        wallet: &Pubkey,
        network: Network,
        now: SystemTime,
    ) -> Vec<AuditRecord> {
        let timestamp = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
        let date_utc = humantime::format_rfc3339_seconds(now).to_string();

        report
            .batches
            .iter()
            .map(|batch| AuditRecord {
                timestamp,
                date_utc: date_utc.clone(),
                network: network.to_string(),
                wallet: wallet.to_string(),
                batch: batch.index + 1,
                accounts: batch.account_count,
                lamports: batch.lamports,
                rent_sol: lamports_to_sol(batch.lamports),
                outcome: batch.outcome.kind().to_string(),
                signature: batch.outcome.signature().map(|s| s.to_string()).unwrap_or_default(),
            })
            .collect()
    }

    pub fn append_report(
        &self,
        report: &RunReport,
        wallet: &Pubkey,
        network: Network,
    ) -> Result<usize, ReclaimError> {
        let records = Self::records_for(report, wallet, network, SystemTime::now());
        self.append(&records)?;
        Ok(records.len())
    }

    pub fn append(&self, records: &[AuditRecord]) -> Result<(), ReclaimError> {
        if records.is_empty() {
            return Ok(());
        }

        let has_header = self.path.exists() && self.path.metadata()?.len() > 0;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(!has_header).from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read(&self) -> Result<Vec<AuditRecord>, ReclaimError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_reader(File::open(&self.path)?);
        let mut records = Vec::new();
        for row in reader.deserialize() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping malformed audit row in {}: {e}", self.path.display()),
            }
        }
        Ok(records)
    }

    pub fn summary(&self, now: SystemTime) -> Result<AuditSummary, ReclaimError> {
        let cutoff = now
            .checked_sub(THIRTY_DAYS)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let confirmed = OutcomeKind::Confirmed.to_string();
        let timed_out = OutcomeKind::TimedOut.to_string();

        let mut summary = AuditSummary::default();
        for record in self.read()? {
            if record.outcome == confirmed {
                summary.confirmed_transactions += 1;
                summary.accounts_closed += record.accounts;
                summary.reclaimed_lamports += record.lamports;
                if record.timestamp >= cutoff {
                    summary.reclaimed_lamports_30d += record.lamports;
                }
            } else if record.outcome == timed_out {
                summary.timed_out_transactions += 1;
            } else {
                summary.rejected_transactions += 1;
            }
        }
        Ok(summary)
    }
}
