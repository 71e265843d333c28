use clap::ValueEnum;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, style::Color, Terminal};
use reclaim_lib::{
    account::{lamports_to_sol, RecordRef},
    audit::AuditLog,
    batch::BatchPlanner,
    constant::EMPTY_SELECTION_MESSAGE,
    engine::{BatchOutcome, RunReport},
    error::ReclaimError,
    Network, ReclaimSession, SessionView,
};
use solana_sdk::pubkey::Pubkey;
use std::{io::Stdout, sync::Arc, time::SystemTime};
use tokio::sync::{mpsc, watch};

use super::{
    config::TICK_RATE,
    state::AppState,
    tui::ui,
    types::{CloseTarget, UiCommand, UiEvent},
    utils::{Approver, UiNotifier},
    ReclaimContext,
};
use crate::log_output;

type UiSender = Option<mpsc::UnboundedSender<UiEvent>>;

// --- Scan ---

pub async fn run_scan(ctx: &ReclaimContext) -> Result<(), ReclaimError> {
    let mut session = ctx.session(Arc::new(UiNotifier::console()), Approver::Auto)?;
    session.refresh().await?;
    print_accounts(&session.view());
    Ok(())
}

pub fn print_accounts(view: &SessionView) {
    if view.accounts.is_empty() {
        println!("No closable token accounts found for {} on {}", view.owner, view.network);
        return;
    }

    println!("Closable token accounts of {} on {}:", view.owner, view.network);
    for (idx, record) in view.accounts.iter().enumerate() {
        println!(
            "{:>4}. {:<24} {} [{}] {:.6} SOL  {}",
            idx + 1,
            record.name(),
            record.account_address,
            record.owner_program,
            lamports_to_sol(record.reclaimable_lamports),
            record.explorer_url(view.network)
        );
    }
    println!("\nYou can get up to {:.6} SOL", lamports_to_sol(view.total_lamports));
}

// --- Close ---

pub async fn run_close(
    ctx: &ReclaimContext,
    target: CloseTarget,
    execute: bool,
    yes: bool,
) -> Result<(), ReclaimError> {
    if execute && !ctx.can_sign() {
        return Err(ReclaimError::SigningError(
            "Closing accounts needs a keypair, pass --keypair or set RECLAIM_KEYPAIR".to_string(),
        ));
    }

    let approver = if yes { Approver::Auto } else { Approver::Stdin };
    let mut session = ctx.session(Arc::new(UiNotifier::console()), approver)?;
    session.refresh().await?;
    select_target(&mut session, &target)?;

    if !execute {
        let records = match target {
            CloseTarget::All => session.accounts().to_vec(),
            _ => session.selection().records().to_vec(),
        };
        return print_plan(&session, &records);
    }

    let report = match target {
        CloseTarget::All => session.close_all().await?,
        _ => session.close_selected().await?,
    };
    record_run(&ctx.audit, &report, session.owner(), session.network(), &None);

    match report.aborted {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Marks the accounts named by `target` as selected. Naming an account twice selects it once.
pub fn select_target(session: &mut ReclaimSession, target: &CloseTarget) -> Result<(), ReclaimError> {
    match target {
        CloseTarget::All => Ok(()),
        CloseTarget::Addresses(addresses) => {
            for address in addresses {
                let record = find_record(session.accounts(), address).ok_or_else(|| {
                    ReclaimError::ValidationError(format!(
                        "{address} is not a closable token account of {}",
                        session.owner()
                    ))
                })?;
                if !session.selection().is_selected(&record) {
                    session.toggle_selection(&record)?;
                }
            }
            Ok(())
        }
        CloseTarget::Positions(positions) => {
            for &position in positions {
                let record = position
                    .checked_sub(1)
                    .and_then(|idx| session.accounts().get(idx).cloned())
                    .ok_or_else(|| {
                        ReclaimError::ValidationError(format!(
                            "No account at position {position}, `scan` lists {} accounts",
                            session.accounts().len()
                        ))
                    })?;
                if !session.selection().is_selected(&record) {
                    session.toggle_selection(&record)?;
                }
            }
            Ok(())
        }
    }
}

fn find_record(accounts: &[RecordRef], address: &Pubkey) -> Option<RecordRef> {
    accounts.iter().find(|r| r.account_address == *address).cloned()
}

fn print_plan(session: &ReclaimSession, records: &[RecordRef]) -> Result<(), ReclaimError> {
    if records.is_empty() {
        return Err(ReclaimError::ValidationError(EMPTY_SELECTION_MESSAGE.to_string()));
    }

    let plan = BatchPlanner::from_config(session.config())?.plan(records)?;
    println!(
        "Dry run: {} account(s) in {} transaction(s), {:.6} SOL",
        plan.total_records(),
        plan.len(),
        lamports_to_sol(plan.total_lamports())
    );
    for batch in &plan {
        println!(
            "  Tx {}/{}: accounts {}..{} ({}), {:.6} SOL, compute unit limit {}",
            batch.index + 1,
            plan.len(),
            batch.lower_bound + 1,
            batch.upper_bound,
            batch.len(),
            lamports_to_sol(batch.total_lamports()),
            batch.units_requested
        );
        for record in &batch.records {
            println!("      {} {}", record.account_address, record.name());
        }
    }
    println!("Nothing was sent. Re-run with --execute to close these accounts.");
    Ok(())
}

/// Writes the run to the audit trail and reports the totals
pub fn record_run(
    audit: &AuditLog,
    report: &RunReport,
    owner: &Pubkey,
    network: Network,
    tx: &UiSender,
) {
    if let Err(e) = audit.append_report(report, owner, network) {
        log_output!(tx, "AUDIT".to_string(), format!("Failed to write {}: {e}", audit.path().display()), Color::Red);
    }

    let confirmed_accounts: usize = report
        .batches
        .iter()
        .filter(|b| matches!(b.outcome, BatchOutcome::Confirmed { .. }))
        .map(|b| b.account_count)
        .sum();
    log_output!(
        tx,
        "SUMMARY".to_string(),
        format!(
            "{}/{} tx confirmed, {} timed out | {} account(s) closed, {:.6} SOL reclaimed",
            report.confirmed_count(),
            report.planned_batches,
            report.timed_out_count(),
            confirmed_accounts,
            lamports_to_sol(report.confirmed_lamports())
        ),
        Color::Cyan
    );

    if let Some(e) = &report.refresh_error {
        log_output!(tx, "WARNING".to_string(), format!("Account list is stale: {e}"), Color::Yellow);
    }
}

// --- Stats ---

pub async fn show_stats(ctx: &ReclaimContext) -> Result<(), ReclaimError> {
    println!("Gathering live blockchain data (this may take a moment)...");
    let mut session = ctx.session(Arc::new(UiNotifier::console()), Approver::Auto)?;
    session.refresh().await?;

    let summary = ctx.audit.summary(SystemTime::now())?;
    let locked_sol = lamports_to_sol(session.total_lamports());
    let total_capital = locked_sol + summary.reclaimed_sol();
    let efficiency = if total_capital > 0.0 { (summary.reclaimed_sol() / total_capital) * 100.0 } else { 0.0 };

    println!("\nRENT RECLAIM STATS ({} on {})", session.owner(), session.network());
    println!("--------------------------");
    println!("Closable Accounts:        {}", session.accounts().len());
    println!("Rent Locked:              {:.4} SOL", locked_sol);
    println!("Accounts Closed:          {}", summary.accounts_closed);
    println!("Rent Reclaimed (total):   {:.4} SOL", summary.reclaimed_sol());
    println!("Rent Reclaimed (30d):     {:.4} SOL", summary.reclaimed_sol_30d());
    println!(
        "Transactions:             {} confirmed, {} timed out, {} rejected",
        summary.confirmed_transactions, summary.timed_out_transactions, summary.rejected_transactions
    );
    println!("Efficiency Gain:          {:.2}%", efficiency);
    println!("--------------------------");

    Ok(())
}

// --- Terminal UI ---

pub async fn run_tui_task(ctx: ReclaimContext) -> Result<(), ReclaimError> {
    let ctx = Arc::new(ctx);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let notifier = Arc::new(UiNotifier::channel(tx.clone()));
    let session = ctx.session(notifier.clone(), Approver::Ui(tx.clone()))?;
    let mut view_rx = session.subscribe();

    let worker = tokio::spawn(run_worker(ctx.clone(), session, cmd_rx, tx, notifier));
    let _ = cmd_tx.send(UiCommand::Refresh);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = AppState::default();
    let result = ui_loop(&mut terminal, &mut app, &mut rx, &mut view_rx, &cmd_tx);

    // Unblocks a worker still waiting on an approval
    app.answer_approval(false);
    worker.abort();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut AppState,
    rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    view_rx: &mut watch::Receiver<SessionView>,
    cmd_tx: &mpsc::UnboundedSender<UiCommand>,
) -> Result<(), ReclaimError> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        while let Ok(event) = rx.try_recv() {
            app.apply(event);
        }
        if view_rx.has_changed().unwrap_or(false) {
            app.set_view(view_rx.borrow_and_update().clone());
        }
        app.tick();

        if !event::poll(TICK_RATE)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('y') => {
                app.answer_approval(true);
            }
            KeyCode::Char('n') if app.pending_approval.is_some() => {
                app.answer_approval(false);
            }
            KeyCode::Up | KeyCode::Char('k') => app.move_up(),
            KeyCode::Down | KeyCode::Char('j') => app.move_down(),
            code => {
                if let Some(command) = command_for(code, app) {
                    if !matches!(command, UiCommand::Toggle(_)) {
                        app.is_working = true;
                    }
                    let _ = cmd_tx.send(command);
                }
            }
        }
    }
}

fn command_for(code: KeyCode, app: &AppState) -> Option<UiCommand> {
    if !app.accepts_commands() {
        return None;
    }
    match code {
        KeyCode::Char(' ') if !app.view.accounts.is_empty() => Some(UiCommand::Toggle(app.cursor)),
        KeyCode::Char('a') => Some(UiCommand::CloseAll),
        KeyCode::Char('s') => Some(UiCommand::CloseSelected),
        KeyCode::Char('r') => Some(UiCommand::Refresh),
        KeyCode::Char('n') => Some(UiCommand::NextNetwork),
        _ => None,
    }
}

pub fn next_network(current: Network) -> Network {
    let networks = Network::value_variants();
    let idx = networks.iter().position(|n| *n == current).unwrap_or_default();
    networks[(idx + 1) % networks.len()]
}

async fn run_worker(
    ctx: Arc<ReclaimContext>,
    mut session: ReclaimSession,
    mut commands: mpsc::UnboundedReceiver<UiCommand>,
    tx: mpsc::UnboundedSender<UiEvent>,
    notifier: Arc<UiNotifier>,
) {
    let out: UiSender = Some(tx.clone());

    while let Some(command) = commands.recv().await {
        match command {
            UiCommand::Refresh => {
                let _ = tx.send(UiEvent::Status("Fetching accounts...".to_string()));
                // Failures are notified by the session
                let _ = session.refresh().await;
            }
            UiCommand::Toggle(idx) => {
                if let Err(e) = session.toggle_selection_at(idx) {
                    log_output!(&out, "ERROR".to_string(), e.to_string(), Color::Red);
                }
            }
            UiCommand::CloseAll | UiCommand::CloseSelected => {
                let _ = tx.send(UiEvent::Status("Closing accounts...".to_string()));
                let result = if command == UiCommand::CloseAll {
                    session.close_all().await
                } else {
                    session.close_selected().await
                };
                // An empty run is rejected and notified by the engine
                if let Ok(report) = result {
                    record_run(&ctx.audit, &report, session.owner(), session.network(), &out);
                }
            }
            UiCommand::NextNetwork => {
                let network = next_network(session.network());
                let _ = tx.send(UiEvent::Status(format!("Switching to {network}...")));
                match ctx.collaborators(network, notifier.clone(), Approver::Ui(tx.clone())) {
                    Ok(collaborators) => {
                        let _ = session.switch_network(network, collaborators).await;
                    }
                    Err(e) => log_output!(&out, "ERROR".to_string(), e.to_string(), Color::Red),
                }
            }
        }

        if !matches!(command, UiCommand::Toggle(_)) {
            let _ = tx.send(UiEvent::Status("Ready".to_string()));
            let _ = tx.send(UiEvent::TaskComplete);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reclaim::utils::ReadOnlyWallet;
    use async_trait::async_trait;
    use reclaim_lib::{
        account::RawTokenAccount, fetch::AccountSource, metadata::NoMetadata,
        token::TokenProgram, Collaborators, Config,
    };

    struct FixedSource {
        accounts: Vec<RawTokenAccount>,
    }

    #[async_trait]
    impl AccountSource for FixedSource {
        async fn fetch_closable_accounts(
            &self,
            _owner: &Pubkey,
            program: TokenProgram,
        ) -> Result<Vec<RawTokenAccount>, ReclaimError> {
            Ok(self.accounts.iter().filter(|a| a.program == program).cloned().collect())
        }
    }

    async fn fetched_session(count: usize) -> (ReclaimSession, Vec<Pubkey>) {
        let accounts: Vec<_> = (0..count)
            .map(|_| RawTokenAccount {
                address: Pubkey::new_unique(),
                program: TokenProgram::Spl,
                mint: Pubkey::new_unique(),
                lamports: 2_039_280,
            })
            .collect();
        let addresses = accounts.iter().map(|a| a.address).collect();
        let collaborators = Collaborators {
            source: Arc::new(FixedSource { accounts }),
            metadata: Arc::new(NoMetadata),
            submitter: Arc::new(ReadOnlyWallet),
            status_provider: Arc::new(ReadOnlyWallet),
            notifier: Arc::new(UiNotifier::console()),
        };
        let mut session =
            ReclaimSession::new(Config::default(), Pubkey::new_unique(), collaborators).unwrap();
        session.refresh().await.unwrap();
        (session, addresses)
    }

    #[tokio::test]
    async fn test_select_positions_are_one_based() {
        let (mut session, addresses) = fetched_session(3).await;
        select_target(&mut session, &CloseTarget::Positions(vec![3, 1, 3])).unwrap();

        let selected: Vec<_> =
            session.selection().records().iter().map(|r| r.account_address).collect();
        assert_eq!(selected, vec![addresses[2], addresses[0]]);
    }

    #[tokio::test]
    async fn test_select_rejects_position_zero_and_out_of_range() {
        let (mut session, _) = fetched_session(2).await;
        assert!(matches!(
            select_target(&mut session, &CloseTarget::Positions(vec![0])),
            Err(ReclaimError::ValidationError(_))
        ));
        assert!(matches!(
            select_target(&mut session, &CloseTarget::Positions(vec![3])),
            Err(ReclaimError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_select_by_address() {
        let (mut session, addresses) = fetched_session(4).await;
        select_target(&mut session, &CloseTarget::Addresses(vec![addresses[1], addresses[1]]))
            .unwrap();
        assert_eq!(session.selection().len(), 1);

        let unknown = Pubkey::new_unique();
        assert!(matches!(
            select_target(&mut session, &CloseTarget::Addresses(vec![unknown])),
            Err(ReclaimError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_select_all_leaves_selection_empty() {
        let (mut session, _) = fetched_session(2).await;
        select_target(&mut session, &CloseTarget::All).unwrap();
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_next_network_cycles() {
        assert_eq!(next_network(Network::MainnetBeta), Network::Devnet);
        assert_eq!(next_network(Network::Devnet), Network::Testnet);
        assert_eq!(next_network(Network::Testnet), Network::Localnet);
        assert_eq!(next_network(Network::Localnet), Network::MainnetBeta);
    }

    #[test]
    fn test_commands_blocked_while_working() {
        let mut app = AppState::default();
        assert_eq!(command_for(KeyCode::Char('r'), &app), None);

        app.is_working = false;
        assert_eq!(command_for(KeyCode::Char('r'), &app), Some(UiCommand::Refresh));
        assert_eq!(command_for(KeyCode::Char('a'), &app), Some(UiCommand::CloseAll));
        assert_eq!(command_for(KeyCode::Char('s'), &app), Some(UiCommand::CloseSelected));
        // Nothing to toggle in an empty list
        assert_eq!(command_for(KeyCode::Char(' '), &app), None);
    }
}
