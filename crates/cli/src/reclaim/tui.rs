use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
};
use reclaim_lib::account::lamports_to_sol;

use super::state::AppState;

// --- UI Rendering Function ---
pub fn ui(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    let header_text = format!(
        " RENT RECLAIM | {} | {} | {} ",
        app.view.network,
        app.view.owner,
        app.spinner()
    );
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    render_summary(f, app, chunks[1]);
    render_accounts(f, app, chunks[2]);
    render_logs(f, app, chunks[3]);

    let footer_text = match &app.pending_approval {
        Some(pending) => format!(" Approve {}? [y] approve  [n] decline ", pending.summary),
        None => format!(
            " {} | [space] select  [s] close selected  [a] close all  [r] refresh  [n] network  [q] quit ",
            app.status_msg
        ),
    };
    let footer_style = if app.pending_approval.is_some() {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let footer = Paragraph::new(footer_text).style(footer_style).alignment(Alignment::Center);
    f.render_widget(footer, chunks[4]);
}

fn render_summary(f: &mut Frame, app: &AppState, area: Rect) {
    let stats_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let (alert_color, alert_title) = if app.is_high_rent() {
        (Color::Red, " HIGH RENT LOCKED ")
    } else {
        (Color::Green, " Reclaimable Rent ")
    };

    let fetched = if app.view.is_fetched { "up to date" } else { "fetching..." };
    let kpi_text = vec![
        Line::from(vec![
            Span::raw("You can get up to: "),
            Span::styled(
                format!("{:.4} SOL", app.locked_sol()),
                Style::default().fg(alert_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("Closable accounts:  "),
            Span::styled(format!("{}", app.view.accounts.len()), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Account list:       "),
            Span::styled(fetched, Style::default().fg(Color::DarkGray)),
        ]),
    ];
    let kpi_block = Paragraph::new(kpi_text).block(
        Block::default()
            .title(alert_title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(alert_color)),
    );
    f.render_widget(kpi_block, stats_chunks[0]);

    let selected_lamports = app.view.selected_lamports();
    let percent = if app.view.total_lamports > 0 {
        ((selected_lamports as u128 * 100) / app.view.total_lamports as u128) as u16
    } else {
        0
    };
    let gauge = Gauge::default()
        .block(Block::default().title(" Selection ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(percent.min(100))
        .label(format!(
            "{} selected | {:.4} SOL",
            app.view.selection.len(),
            lamports_to_sol(selected_lamports)
        ));
    f.render_widget(gauge, stats_chunks[1]);
}

fn render_accounts(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["", "Token", "Account", "Program", "Rent (SOL)"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let table_header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = app.view.accounts.iter().enumerate().map(|(idx, record)| {
        let marker = if app.view.is_selected(record) { "[x]" } else { "[ ]" };
        let mut style = if app.view.is_selected(record) {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        if idx == app.cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Row::new(vec![
            Cell::from(marker),
            Cell::from(record.name().to_string()),
            Cell::from(record.account_address.to_string()),
            Cell::from(record.owner_program.to_string()),
            Cell::from(format!("{:.6}", lamports_to_sol(record.reclaimable_lamports))),
        ])
        .style(style)
    });

    let t = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Percentage(25),
            Constraint::Percentage(45),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(table_header)
    .block(Block::default().borders(Borders::ALL).title(" Closable Accounts "))
    .column_spacing(1);
    f.render_widget(t, area);
}

fn render_logs(f: &mut Frame, app: &AppState, area: Rect) {
    let rows = app.logs.iter().rev().map(|(source, details, color)| {
        Row::new(vec![
            Cell::from(source.clone()).style(Style::default().fg(*color).add_modifier(Modifier::BOLD)),
            Cell::from(details.clone()).style(Style::default().fg(*color)),
        ])
    });

    let t = Table::new(rows, [Constraint::Length(10), Constraint::Min(20)])
        .block(Block::default().borders(Borders::ALL).title(" Live Logs "))
        .column_spacing(1);
    f.render_widget(t, area);
}
