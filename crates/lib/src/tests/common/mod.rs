use std::sync::{Arc, Mutex};

/// Common test utilities and centralized re-exports
///
/// This module provides:
/// 1. A notifier that records every message for later assertions
/// 2. Centralized re-exports of commonly used mock utilities
use crate::notify::{Notifier, Severity};
use solana_sdk::signature::Signature;

// Re-export mock utilities for centralized access
pub use crate::tests::{account_mock::*, config_mock::ConfigMockBuilder, rpc_mock::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub signature: Option<Signature>,
}

#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }

    pub fn count(&self, severity: Severity, message: &str) -> usize {
        self.notifications()
            .iter()
            .filter(|n| n.severity == severity && n.message == message)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str, signature: Option<Signature>) {
        self.notifications.lock().unwrap().push(Notification {
            severity,
            message: message.to_string(),
            signature,
        });
    }
}

/// Distinct, deterministic signature for batch `n`
pub fn signature_for(n: u8) -> Signature {
    Signature::from([n; 64])
}
