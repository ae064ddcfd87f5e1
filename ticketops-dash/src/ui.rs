//! Dashboard rendering.
//!
//! One widget per aggregation: metric tiles, state and classifier charts,
//! the daily creation trend, resolution/reopening panels, the period
//! counters, and the tabbed detail tables.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Sparkline, Table, Tabs};
use ratatui::Frame;

use crate::app::{ActiveTable, App};
use ticketops_core::types::TicketState;

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // header
            Constraint::Length(4),  // metric tiles
            Constraint::Length(9),  // distribution charts
            Constraint::Length(6),  // creation trend
            Constraint::Length(6),  // analysis panels
            Constraint::Min(8),     // detail tables
            Constraint::Length(1),  // footer
        ])
        .split(frame.area());

    render_header(frame, app, rows[0]);
    render_tiles(frame, app, rows[1]);
    render_charts(frame, app, rows[2]);
    render_trend(frame, app, rows[3]);
    render_panels(frame, app, rows[4]);
    render_tables(frame, app, rows[5]);
    render_footer(frame, rows[6]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            " ticketops ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(&app.status, Style::default().fg(DIM)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn tile(frame: &mut Frame, area: Rect, title: &str, value: String, caption: String) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let lines = vec![
        Line::from(Span::styled(
            value,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(caption, Style::default().fg(DIM))),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_tiles(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let m = &app.data.metrics;
    tile(frame, cols[0], "Total", m.total.to_string(), "tickets".into());
    tile(
        frame,
        cols[1],
        "Open",
        m.open.to_string(),
        format!("{:.1}%", m.share(m.open)),
    );
    tile(
        frame,
        cols[2],
        "In progress",
        m.in_progress.to_string(),
        format!("{:.1}%", m.share(m.in_progress)),
    );
    tile(
        frame,
        cols[3],
        "Closed",
        m.closed.to_string(),
        format!("{:.1}%", m.share(m.closed)),
    );
    tile(
        frame,
        cols[4],
        "Reopenings",
        m.reopenings.to_string(),
        "total".into(),
    );
}

fn render_charts(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let m = &app.data.metrics;
    let state_data: Vec<(&str, u64)> = vec![
        (TicketState::Open.as_str(), m.open.max(0) as u64),
        (TicketState::InProgress.as_str(), m.in_progress.max(0) as u64),
        (TicketState::Closed.as_str(), m.closed.max(0) as u64),
    ];
    let state_chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("By state"))
        .data(&state_data)
        .bar_width(11)
        .bar_gap(2)
        .bar_style(Style::default().fg(ACCENT))
        .value_style(Style::default().fg(Color::Black).bg(ACCENT));
    frame.render_widget(state_chart, cols[0]);

    let classifier_data: Vec<(&str, u64)> = app
        .data
        .classifier_counts
        .iter()
        .map(|(name, count)| (name.as_str(), (*count).max(0) as u64))
        .collect();
    let classifier_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Top classifiers"),
        )
        .data(&classifier_data)
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Green))
        .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    frame.render_widget(classifier_chart, cols[1]);
}

fn render_trend(frame: &mut Frame, app: &App, area: Rect) {
    let data: Vec<u64> = app
        .data
        .trend
        .iter()
        .map(|p| p.count.max(0) as u64)
        .collect();

    let title = match (app.data.trend.first(), app.data.trend.last()) {
        (Some(first), Some(last)) => format!(
            "Created per day ({} .. {})",
            first.day, last.day
        ),
        _ => "Created per day".to_string(),
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .style(Style::default().fg(ACCENT));
    frame.render_widget(sparkline, area);
}

fn render_panels(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    // Resolution time (creation-scoped window)
    let resolution_lines = match &app.data.resolution {
        Some(stats) => vec![
            Line::from(format!("mean {:.1} days", stats.mean_days)),
            Line::from(format!("min  {:.1} days", stats.min_days)),
            Line::from(format!("max  {:.1} days", stats.max_days)),
        ],
        None => vec![Line::from(Span::styled(
            "no resolved tickets in range",
            Style::default().fg(DIM),
        ))],
    };
    frame.render_widget(
        Paragraph::new(resolution_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Resolution time"),
        ),
        cols[0],
    );

    // Reopening split (not date-scoped)
    let r = &app.data.reopening;
    let rate = if r.total > 0 {
        r.with_reopenings as f64 / r.total as f64 * 100.0
    } else {
        0.0
    };
    let reopening_lines = vec![
        Line::from(format!("with reopenings    {}", r.with_reopenings)),
        Line::from(format!("without reopenings {}", r.without_reopenings)),
        Line::from(Span::styled(
            format!("rate {:.1}% of {} tickets", rate, r.total),
            Style::default().fg(DIM),
        )),
    ];
    frame.render_widget(
        Paragraph::new(reopening_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Reopening rate"),
        ),
        cols[1],
    );

    // Period event counters
    let period_lines = vec![
        Line::from(format!("intake     {}", app.data.intake)),
        Line::from(format!("closures   {}", app.data.closures)),
        Line::from(format!("reopenings {}", app.data.reopenings_in_period)),
    ];
    frame.render_widget(
        Paragraph::new(period_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("In period (events)"),
        ),
        cols[2],
    );
}

fn render_tables(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(area);

    let titles = vec![
        format!("Tickets ({})", app.data.tickets.len()),
        format!("Recent actions ({})", app.data.actions.len()),
    ];
    let selected = match app.active_table {
        ActiveTable::Tickets => 0,
        ActiveTable::Actions => 1,
    };
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, rows[0]);

    match app.active_table {
        ActiveTable::Tickets => render_ticket_table(frame, app, rows[1]),
        ActiveTable::Actions => render_action_table(frame, app, rows[1]),
    }
}

fn render_ticket_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        "id", "title", "state", "classifier", "created", "closed", "reopened",
    ])
    .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .data
        .tickets
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.id.clone()),
                Cell::from(t.title.clone()),
                Cell::from(t.current_state.as_str()),
                Cell::from(t.classifier().to_string()),
                Cell::from(t.created_at.format("%Y-%m-%d").to_string()),
                Cell::from(
                    t.closed_at
                        .map(|c| c.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(t.reopen_count.to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Active during period"),
    );
    frame.render_widget(table, area);
}

fn render_action_table(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec!["when", "ticket", "action", "user", "transition"])
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .data
        .actions
        .iter()
        .map(|a| {
            let transition = match (a.from, a.to) {
                (Some(from), Some(to)) => format!("{} -> {}", from, to),
                _ => "-".to_string(),
            };
            Row::new(vec![
                Cell::from(a.timestamp.format("%Y-%m-%d %H:%M").to_string()),
                Cell::from(a.ticket_id.clone()),
                Cell::from(a.action.clone()),
                Cell::from(a.user_id.clone()),
                Cell::from(transition),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Min(16),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("History"));
    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Line::from(Span::styled(
        " q quit | r reload | Tab tables | s state | c classifier | \u{2190}/\u{2192} shift window | +/- resize window",
        Style::default().fg(DIM),
    ));
    frame.render_widget(Paragraph::new(footer), area);
}
