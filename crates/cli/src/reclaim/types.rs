use ratatui::style::Color;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::oneshot;

/// Events sent from the background worker to the UI loop
pub enum UiEvent {
    Log(String, String, Color),
    Status(String),
    /// A transaction is waiting for the user's go-ahead
    ApprovalRequested { summary: String, respond: oneshot::Sender<bool> },
    TaskComplete,
}

/// Requests sent from the UI loop to the background worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Refresh,
    Toggle(usize),
    CloseAll,
    CloseSelected,
    NextNetwork,
}

/// Which accounts a `close` command works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseTarget {
    All,
    Addresses(Vec<Pubkey>),
    /// 1-based positions as printed by `scan`
    Positions(Vec<usize>),
}
