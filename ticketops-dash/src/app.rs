//! Application state for the dashboard TUI.

use anyhow::Result;
use chrono::{Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ticketops_core::analytics::{
    self, ClassifierSelection, DashboardFilter, ReopeningStats, ResolutionStats, StateFilter,
    TicketMetrics, TrendPoint,
};
use ticketops_core::config::DashboardConfig;
use ticketops_core::taxonomy;
use ticketops_core::types::{ActionEntry, Ticket, TicketState};
use ticketops_core::Database;

/// Which detail table is in front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveTable {
    #[default]
    Tickets,
    Actions,
}

/// Everything one reload pulls from the store, one query per widget.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub metrics: TicketMetrics,
    pub classifier_counts: Vec<(String, i64)>,
    pub trend: Vec<TrendPoint>,
    pub resolution: Option<ResolutionStats>,
    pub reopening: ReopeningStats,
    pub intake: i64,
    pub closures: i64,
    pub reopenings_in_period: i64,
    pub tickets: Vec<Ticket>,
    pub actions: Vec<ActionEntry>,
}

/// Main application state.
pub struct App {
    db: Database,
    /// Explicit filter value passed into every aggregation call
    pub filter: DashboardFilter,
    /// Selectable classifiers (All sentinel first, then level >= 2 by name)
    pub classifier_options: Vec<ClassifierSelection>,
    classifier_index: usize,
    /// 0 = all states, 1..=5 indexes into TicketState::ALL
    state_index: usize,
    pub data: DashboardData,
    pub active_table: ActiveTable,
    pub caps: DashboardConfig,
    /// Status line content (reload outcome or error)
    pub status: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, caps: DashboardConfig) -> Self {
        let filter = DashboardFilter::default_window(Utc::now(), caps.window_days);
        Self {
            db,
            filter,
            classifier_options: vec![ClassifierSelection::All],
            classifier_index: 0,
            state_index: 0,
            data: DashboardData::default(),
            active_table: ActiveTable::default(),
            caps,
            status: String::new(),
            should_quit: false,
        }
    }

    /// Load the selectable classifier list from the reference data.
    pub fn load_classifier_options(&mut self) -> Result<()> {
        self.classifier_options = taxonomy::selectable_classifiers(&self.db)?;
        if self.classifier_index >= self.classifier_options.len() {
            self.classifier_index = 0;
        }
        Ok(())
    }

    /// Re-run every widget query under the current filter.
    pub fn reload(&mut self) -> Result<()> {
        let filter = &self.filter;
        let db = &self.db;

        self.data = DashboardData {
            metrics: analytics::metrics::ticket_metrics(db, filter)?,
            classifier_counts: analytics::metrics::tickets_by_classifier(
                db,
                filter,
                self.caps.classifier_limit,
            )?,
            trend: analytics::metrics::creation_trend(db, filter)?,
            resolution: analytics::metrics::resolution_time(db, filter)?,
            reopening: analytics::metrics::reopening_stats(db, filter.state, &filter.classifier)?,
            intake: analytics::metrics::intake_count(db, &filter.range, filter.state)?,
            closures: analytics::metrics::closures_in_period(
                db,
                &filter.range,
                &filter.classifier,
            )?,
            reopenings_in_period: analytics::metrics::reopenings_in_period(
                db,
                &filter.range,
                &filter.classifier,
            )?,
            tickets: analytics::metrics::active_tickets(db, filter, self.caps.tickets_limit)?,
            actions: analytics::metrics::recent_actions(
                db,
                &filter.range,
                &filter.classifier,
                self.caps.actions_limit,
            )?,
        };

        self.status = format!(
            "{} .. {}  state: {}  classifier: {}",
            self.filter.range.start.format("%Y-%m-%d"),
            self.filter.range.end.format("%Y-%m-%d"),
            self.filter.state.label(),
            self.filter.classifier.label(),
        );
        Ok(())
    }

    /// Handle a key press. Filter changes trigger a reload.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.reload_with_status(),
            KeyCode::Tab => {
                self.active_table = match self.active_table {
                    ActiveTable::Tickets => ActiveTable::Actions,
                    ActiveTable::Actions => ActiveTable::Tickets,
                };
            }
            KeyCode::Char('s') => {
                self.state_index = (self.state_index + 1) % (TicketState::ALL.len() + 1);
                self.filter.state = if self.state_index == 0 {
                    StateFilter::All
                } else {
                    StateFilter::Only(TicketState::ALL[self.state_index - 1])
                };
                self.reload_with_status();
            }
            KeyCode::Char('c') => {
                if !self.classifier_options.is_empty() {
                    self.classifier_index =
                        (self.classifier_index + 1) % self.classifier_options.len();
                    self.filter.classifier =
                        self.classifier_options[self.classifier_index].clone();
                    self.reload_with_status();
                }
            }
            KeyCode::Left => {
                self.shift_window(-7);
            }
            KeyCode::Right => {
                self.shift_window(7);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.filter.range.start = self.filter.range.start - Duration::days(7);
                self.reload_with_status();
            }
            KeyCode::Char('-') => {
                let narrowed = self.filter.range.start + Duration::days(7);
                if narrowed < self.filter.range.end {
                    self.filter.range.start = narrowed;
                    self.reload_with_status();
                }
            }
            _ => {}
        }
    }

    fn shift_window(&mut self, days: i64) {
        self.filter.range.start = self.filter.range.start + Duration::days(days);
        self.filter.range.end = self.filter.range.end + Duration::days(days);
        self.reload_with_status();
    }

    fn reload_with_status(&mut self) {
        if let Err(e) = self.reload() {
            tracing::error!(error = %e, "Dashboard reload failed");
            self.status = format!("reload failed: {}", e);
        }
    }
}
