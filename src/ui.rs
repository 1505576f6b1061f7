use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, InputMode, NoticeLevel};
use crate::state::ModeKind;

const COLUMNS: [&str; 5] = ["Time", "Source IP", "Destination IP", "Protocol", "Length"];

pub fn render_ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    render_status_bar(frame, chunks[0], app);
    render_packets_table(frame, chunks[1], app);
    render_bottom_bar(frame, chunks[2], app);
}

fn mode_label(mode: ModeKind) -> (&'static str, Color) {
    match mode {
        ModeKind::Idle => ("IDLE", Color::Gray),
        ModeKind::Live => ("LIVE", Color::Green),
        ModeKind::Static => ("UPLOAD", Color::Cyan),
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let (label, color) = mode_label(state.mode());
    let mut first = vec![
        Span::styled(
            format!(" {label} "),
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} packets", state.packets().len())),
    ];
    if state.is_live() {
        let session = state.session();
        first.push(Span::raw(format!(
            " | received {} | skipped {}",
            session.received, session.skipped
        )));
    }
    if state.upload_pending() {
        first.push(Span::styled(" | uploading", Style::default().fg(Color::Yellow)));
    }
    first.push(Span::styled(
        format!(" | {}", app.endpoints.base()),
        Style::default().fg(Color::DarkGray),
    ));
    if app.endpoints.is_secure() {
        first.push(Span::styled(" [tls]", Style::default().fg(Color::Green)));
    }

    let second = match &app.notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Gray,
                NoticeLevel::Error => Color::Red,
            };
            Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
        }
        None => Line::from(""),
    };

    let status = Paragraph::new(vec![Line::from(first), second])
        .block(Block::default().title(" pktview ").borders(Borders::ALL));
    frame.render_widget(status, area);
}

/// Rows follow the packet list order, newest first while live.
fn render_packets_table(frame: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(COLUMNS.iter().map(|title| Cell::from(*title)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .height(1);

    let rows: Vec<Row> = app
        .state
        .packets()
        .iter()
        .enumerate()
        .map(|(index, packet)| {
            let stripe = if index % 2 == 0 {
                Style::default()
            } else {
                Style::default().bg(Color::Rgb(30, 30, 30))
            };
            Row::new(vec![
                Cell::from(packet.timestamp.to_string()),
                Cell::from(packet.src_ip.clone()),
                Cell::from(packet.dst_ip.clone()),
                Cell::from(packet.protocol.clone())
                    .style(Style::default().fg(protocol_color(&packet.protocol))),
                Cell::from(packet.length.to_string()),
            ])
            .style(stripe)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Min(16),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().title(" Packets ").borders(Borders::ALL))
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn protocol_color(protocol: &str) -> Color {
    match protocol.to_ascii_uppercase().as_str() {
        "TCP" => Color::Green,
        "UDP" => Color::Blue,
        "ICMPV4" | "ICMPV6" | "ICMP" => Color::Red,
        _ => Color::Reset,
    }
}

fn render_bottom_bar(frame: &mut Frame, area: Rect, app: &App) {
    let line = match &app.input {
        InputMode::UploadPrompt { path } => Line::from(vec![
            Span::styled(" Upload capture (.pcap, .cap): ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{path}_")),
            Span::styled("  Enter send  Esc cancel", Style::default().fg(Color::DarkGray)),
        ]),
        InputMode::Normal => {
            let toggle = if app.state.is_live() {
                "Stop live"
            } else {
                "Start live"
            };
            let keys = [
                ("SPACE", toggle),
                ("u", "Upload"),
                ("↑↓", "Scroll"),
                ("q", "Quit"),
            ];
            Line::from(
                keys.iter()
                    .flat_map(|(key, desc)| {
                        [
                            Span::styled(
                                format!(" {key} "),
                                Style::default().fg(Color::Black).bg(Color::White),
                            ),
                            Span::styled(format!(" {desc}  "), Style::default().fg(Color::Gray)),
                        ]
                    })
                    .collect::<Vec<_>>(),
            )
        }
    };
    let bar = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(bar, area);
}
