use ratatui::style::Color;
use reclaim_lib::{account::lamports_to_sol, SessionView};
use tokio::sync::oneshot;

use super::{
    config::{HIGH_RENT_THRESHOLD_SOL, MAX_LOG_LINES, SPINNER_FRAMES},
    types::UiEvent,
};

pub struct PendingApproval {
    pub summary: String,
    pub respond: oneshot::Sender<bool>,
}

pub struct AppState {
    pub view: SessionView,
    pub cursor: usize,
    pub logs: Vec<(String, String, Color)>,
    pub status_msg: String,
    pub spinner_idx: usize,
    pub is_working: bool,
    pub pending_approval: Option<PendingApproval>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            view: SessionView::default(),
            cursor: 0,
            logs: vec![],
            status_msg: "Initializing...".to_string(),
            spinner_idx: 0,
            is_working: true,
            pending_approval: None,
        }
    }
}

impl AppState {
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(source, details, color) => {
                if self.logs.len() >= MAX_LOG_LINES {
                    self.logs.remove(0);
                }
                self.logs.push((source, details, color));
            }
            UiEvent::Status(msg) => self.status_msg = msg,
            UiEvent::ApprovalRequested { summary, respond } => {
                // A newer request supersedes an unanswered one, which counts as declined
                if let Some(previous) = self.pending_approval.take() {
                    let _ = previous.respond.send(false);
                }
                self.pending_approval = Some(PendingApproval { summary, respond });
            }
            UiEvent::TaskComplete => self.is_working = false,
        }
    }

    /// Replaces the session snapshot and keeps the cursor inside the new list
    pub fn set_view(&mut self, view: SessionView) {
        self.view = view;
        self.cursor = self.cursor.min(self.view.accounts.len().saturating_sub(1));
    }

    pub fn answer_approval(&mut self, approved: bool) -> bool {
        match self.pending_approval.take() {
            Some(pending) => {
                let _ = pending.respond.send(approved);
                true
            }
            None => false,
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.view.accounts.len() {
            self.cursor += 1;
        }
    }

    pub fn tick(&mut self) {
        if self.is_working || self.view.is_closing {
            self.spinner_idx = (self.spinner_idx + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        if self.is_working || self.view.is_closing {
            SPINNER_FRAMES[self.spinner_idx]
        } else {
            "✓"
        }
    }

    pub fn locked_sol(&self) -> f64 {
        lamports_to_sol(self.view.total_lamports)
    }

    pub fn is_high_rent(&self) -> bool {
        self.locked_sol() > HIGH_RENT_THRESHOLD_SOL
    }

    /// Commands are ignored while the worker is busy or a transaction awaits approval
    pub fn accepts_commands(&self) -> bool {
        !self.is_working && !self.view.is_closing && self.pending_approval.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclaim_lib::{account::AccountRecord, token::TokenProgram};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;

    fn view_with(count: usize, lamports: u64) -> SessionView {
        let accounts: Vec<_> = (0..count)
            .map(|_| {
                Arc::new(AccountRecord {
                    account_address: Pubkey::new_unique(),
                    owner_program: TokenProgram::Spl,
                    mint: Pubkey::new_unique(),
                    display_name: None,
                    image_uri: None,
                    reclaimable_lamports: lamports,
                })
            })
            .collect();
        SessionView {
            total_lamports: lamports * count as u64,
            accounts,
            is_fetched: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut app = AppState::default();
        app.set_view(view_with(3, 2_039_280));

        app.move_up();
        assert_eq!(app.cursor, 0);
        app.move_down();
        app.move_down();
        app.move_down();
        assert_eq!(app.cursor, 2);

        app.set_view(view_with(1, 2_039_280));
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn test_log_is_capped() {
        let mut app = AppState::default();
        for i in 0..MAX_LOG_LINES + 5 {
            app.apply(UiEvent::Log("INFO".to_string(), i.to_string(), Color::White));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs[0].1, "5");
    }

    #[tokio::test]
    async fn test_approval_roundtrip() {
        let mut app = AppState::default();
        let (tx, rx) = oneshot::channel();
        app.apply(UiEvent::ApprovalRequested { summary: "1 account".to_string(), respond: tx });

        assert!(!app.accepts_commands());
        assert!(app.answer_approval(true));
        assert!(rx.await.unwrap());
        assert!(!app.answer_approval(false));
    }

    #[tokio::test]
    async fn test_superseded_approval_is_declined() {
        let mut app = AppState::default();
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, _second_rx) = oneshot::channel();
        app.apply(UiEvent::ApprovalRequested { summary: "first".to_string(), respond: first_tx });
        app.apply(UiEvent::ApprovalRequested { summary: "second".to_string(), respond: second_tx });

        assert!(!first_rx.await.unwrap());
        assert_eq!(app.pending_approval.as_ref().unwrap().summary, "second");
    }

    #[test]
    fn test_high_rent_threshold() {
        let mut app = AppState::default();
        app.set_view(view_with(2, 400_000_000));
        assert!(!app.is_high_rent());
        app.set_view(view_with(3, 400_000_000));
        assert!(app.is_high_rent());
    }
}
