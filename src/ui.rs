use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, LookupState, Tab};
use crate::types::ConnectionState;
use crate::util_text::{
    format_amount, format_countdown, format_opt, format_thousands, format_time_hms, short_hash,
};

// ===============================
// Top-level draw
// ===============================
pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    header(f, chunks[0], app);
    match app.tab() {
        Tab::Blocks => blocks_body(f, chunks[1], app),
        Tab::Address => address_body(f, chunks[1], app),
    }
    footer(f, chunks[2], app);
}

// ===============================
// Header / Footer
// ===============================
fn state_span(state: ConnectionState) -> Span<'static> {
    match state {
        ConnectionState::Online => Span::styled("● online", Style::default().fg(Color::Green)),
        ConnectionState::Offline => Span::styled("● offline", Style::default().fg(Color::Red)),
        ConnectionState::Connecting => {
            Span::styled("● connecting", Style::default().fg(Color::Yellow))
        }
    }
}

fn header(f: &mut Frame, area: Rect, app: &App) {
    let titles = [(Tab::Blocks, "Blocks"), (Tab::Address, "Address Lookup")];
    let mut spans = vec![Span::raw(" ")];
    for (tab, title) in titles {
        let style = if tab == app.tab() {
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(format!(" {title} "), style));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::raw("│ "));
    spans.push(state_span(app.view().state));
    if app.view().is_loading {
        spans.push(Span::styled(
            "  refreshing…",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn footer(f: &mut Frame, area: Rect, app: &App) {
    let hints = match (app.tab(), app.input_mode()) {
        (_, InputMode::Address) => " type address · Enter lookup · Esc cancel",
        (Tab::Blocks, _) => " q quit · Tab switch · ↑/↓ select · r refresh now",
        (Tab::Address, _) => " q quit · Tab switch · i edit address · r refresh",
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().add_modifier(Modifier::DIM),
        ))),
        area,
    );
}

// ===============================
// Blocks tab
// ===============================
fn blocks_body(f: &mut Frame, area: Rect, app: &mut App) {
    let view = app.view();

    if view.state == ConnectionState::Offline {
        offline_banner(f, area, app);
        return;
    }

    if view.is_loading && view.entries.is_empty() {
        let p = Paragraph::new("Connecting to backend…")
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    status_line(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    block_list(f, body[0], app);
    block_details(f, body[1], app);
}

fn status_line(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let height = view
        .tip_height
        .map(format_thousands)
        .unwrap_or_else(|| "N/A".to_string());
    let line = Line::from(vec![
        Span::raw(" Height: "),
        Span::styled(height, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("   Next block predicted in: "),
        Span::styled(
            format_countdown(view.next_arrival_countdown_secs),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn block_list(f: &mut Frame, area: Rect, app: &mut App) {
    let new_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let items: Vec<ListItem> = app
        .visible_entries()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut spans = vec![
                Span::styled(
                    format!("#{:<9}", e.height),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {} ", short_hash(&e.hash, 6))),
                Span::styled(
                    format_time_hms(&e.timestamp),
                    Style::default().add_modifier(Modifier::DIM),
                ),
                Span::raw(format!("  {} txs", format_opt(e.tx_count))),
            ];
            if app.is_new_position(i) {
                spans.push(Span::styled("  NEW", new_style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let empty = items.is_empty();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Recent Blocks (newer ↑) "),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !empty {
        state.select(Some(app.sel_entry()));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn block_details(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_entry() {
        Some(e) => vec![
            Line::from(format!("Height:          #{}", e.height)),
            Line::from(format!("Hash:            {}", e.hash)),
            Line::from(format!("Timestamp:       {}", format_time_hms(&e.timestamp))),
            Line::from(format!("Transactions:    {}", format_opt(e.tx_count))),
            Line::from(format!("UTXOs Created:   {}", format_opt(e.utxo_created))),
            Line::from(format!("UTXOs Spent:     {}", format_opt(e.utxo_spent))),
            Line::from(format!(
                "Processing Time: {} ms",
                format_opt(e.processing_time_ms)
            )),
        ],
        None => vec![Line::from("No blocks available")],
    };

    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Block Details "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn offline_banner(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let message = view
        .last_error
        .as_deref()
        .unwrap_or("Cannot connect to the indexer backend.");

    let lines = vec![
        Line::from(Span::styled(
            "Backend Offline",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(format!(
            "Reconnection attempts: {}",
            view.reconnect_attempts
        )),
        Line::from(format!(
            "Next attempt in: {}s",
            view.reconnect_countdown_secs
        )),
        Line::from(""),
        Line::from(Span::styled(
            "press r to retry now",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Connection Lost "),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

// ===============================
// Address tab
// ===============================
fn address_body(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let editing = app.input_mode() == InputMode::Address;
    let input = if editing {
        format!("{}▏", app.address_input())
    } else if app.address_input().is_empty() {
        "Enter a Dogecoin address (e.g. D…) — press i".to_string()
    } else {
        app.address_input().to_string()
    };
    let input_style = if editing {
        Style::default().fg(Color::Cyan)
    } else if app.address_input().is_empty() {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };
    f.render_widget(
        Paragraph::new(Span::styled(input, input_style)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Address "),
        ),
        chunks[0],
    );

    match app.lookup() {
        LookupState::Idle => {}
        LookupState::Loading => {
            f.render_widget(Paragraph::new("Looking up…"), chunks[1]);
        }
        LookupState::Failed(msg) => {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!("Error: {msg}"),
                    Style::default().fg(Color::Red),
                )))
                .wrap(Wrap { trim: true }),
                chunks[1],
            );
        }
        LookupState::Done(info) => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(34), Constraint::Min(0)])
                .split(chunks[1]);

            let balance = Paragraph::new(vec![
                Line::from(format!("Available: {}", format_amount(info.balance.available))),
                Line::from(format!("Incoming:  {}", format_amount(info.balance.incoming))),
                Line::from(format!("Current:   {}", format_amount(info.balance.current))),
            ])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" Balance "),
            );
            f.render_widget(balance, cols[0]);

            let items: Vec<ListItem> = if info.utxos.is_empty() {
                vec![ListItem::new("No UTXOs found for this address")]
            } else {
                info.utxos
                    .iter()
                    .map(|u| {
                        ListItem::new(Line::from(vec![
                            Span::raw(format!("{}:{}", short_hash(&u.tx, 8), u.vout)),
                            Span::styled(
                                format!("  {}", format_amount(u.value)),
                                Style::default().fg(Color::Green),
                            ),
                            Span::styled(
                                format!("  {}", u.script_type.as_deref().unwrap_or("N/A")),
                                Style::default().add_modifier(Modifier::DIM),
                            ),
                        ]))
                    })
                    .collect()
            };
            let utxos = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(format!(" UTXOs ({}) ", info.utxos.len())),
            );
            f.render_widget(utxos, cols[1]);
        }
    }
}
