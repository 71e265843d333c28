use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::fmt;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("INFO"),
            Severity::Success => f.write_str("SUCCESS"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

/// Fire-and-forget sink for user-facing progress messages
#[cfg_attr(test, automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str, signature: Option<Signature>);
}

/// Routes notifications into the log output
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str, signature: Option<Signature>) {
        let suffix = signature.map(|s| format!(" ({s})")).unwrap_or_default();
        match severity {
            Severity::Info | Severity::Success => log::info!("{message}{suffix}"),
            Severity::Error => log::error!("{message}{suffix}"),
        }
    }
}
