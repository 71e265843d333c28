use async_trait::async_trait;
use ratatui::style::Color;
use reclaim_lib::{
    error::ReclaimError,
    notify::{Notifier, Severity},
    wallet::{ConfirmationStatus, SignatureStatusProvider, TransactionSubmitter},
};
use solana_sdk::{signature::Signature, transaction::Transaction};
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};
use tokio::sync::{mpsc, oneshot};

use super::types::UiEvent;

// --- Macros ---
#[macro_export]
macro_rules! log_output {
    ($tx:expr, $source:expr, $details:expr, $color:expr) => {
        if let Some(tx) = $tx {
            let _ = tx.send($crate::reclaim::types::UiEvent::Log($source, $details, $color));
        } else {
            println!("{} | {}", $source, $details);
        }
    };
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::White,
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
    }
}

/// Shows engine and session notifications on stdout, or in the terminal UI's log panel
pub struct UiNotifier {
    tx: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl UiNotifier {
    pub fn console() -> Self {
        Self { tx: None }
    }

    pub fn channel(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl Notifier for UiNotifier {
    fn notify(&self, severity: Severity, message: &str, signature: Option<Signature>) {
        let details = match signature {
            Some(sig) => format!("{message} Sig: {sig}"),
            None => message.to_string(),
        };
        log_output!(&self.tx, severity.to_string(), details, severity_color(severity));
    }
}

/// Where the go-ahead for each transaction comes from
pub enum Approver {
    /// `--yes`: every transaction is approved
    Auto,
    /// Asks `[y/N]` on the terminal
    Stdin,
    /// Asks through the terminal UI's footer
    Ui(mpsc::UnboundedSender<UiEvent>),
}

impl Approver {
    pub async fn approve(&self, summary: &str) -> Result<bool, ReclaimError> {
        match self {
            Approver::Auto => Ok(true),
            Approver::Stdin => {
                let prompt = format!("Approve {summary}? [y/N] ");
                tokio::task::spawn_blocking(move || ask_stdin(&prompt))
                    .await
                    .map_err(|e| ReclaimError::InternalError(format!("Approval prompt failed: {e}")))?
            }
            Approver::Ui(tx) => {
                let (respond, answer) = oneshot::channel();
                tx.send(UiEvent::ApprovalRequested { summary: summary.to_string(), respond })
                    .map_err(|_| ReclaimError::InternalError("Terminal UI is gone".to_string()))?;
                // A dropped sender means the UI quit without answering
                Ok(answer.await.unwrap_or(false))
            }
        }
    }
}

fn ask_stdin(prompt: &str) -> Result<bool, ReclaimError> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Number of close instructions in a transaction built by the close engine
pub fn close_count(transaction: &Transaction) -> usize {
    transaction.message.instructions.len().saturating_sub(2)
}

/// Holds every transaction until the approver agrees, then hands it to the wallet.
/// Declining surfaces as a signing error, which ends the run.
pub struct ApprovingSubmitter {
    inner: Arc<dyn TransactionSubmitter>,
    approver: Approver,
}

impl ApprovingSubmitter {
    pub fn new(inner: Arc<dyn TransactionSubmitter>, approver: Approver) -> Self {
        Self { inner, approver }
    }
}

#[async_trait]
impl TransactionSubmitter for ApprovingSubmitter {
    async fn sign_and_submit(&self, transaction: Transaction) -> Result<Signature, ReclaimError> {
        let summary = format!("closing {} token account(s)", close_count(&transaction));
        if !self.approver.approve(&summary).await? {
            return Err(ReclaimError::SigningError("Transaction declined by user".to_string()));
        }
        self.inner.sign_and_submit(transaction).await
    }
}

/// Stand-in wallet when only `--owner` is known. Listing works, signing does not.
pub struct ReadOnlyWallet;

#[async_trait]
impl TransactionSubmitter for ReadOnlyWallet {
    async fn sign_and_submit(&self, _transaction: Transaction) -> Result<Signature, ReclaimError> {
        Err(ReclaimError::SigningError(
            "No keypair configured, pass --keypair or set RECLAIM_KEYPAIR".to_string(),
        ))
    }
}

#[async_trait]
impl SignatureStatusProvider for ReadOnlyWallet {
    async fn query_status(&self, _signature: &Signature) -> Result<ConfirmationStatus, ReclaimError> {
        Ok(ConfirmationStatus::Unknown)
    }
}
