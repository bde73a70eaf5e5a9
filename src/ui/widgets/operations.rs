use crate::api::models::{ScraperSettings, SentimentLabel, SessionStatus};
use crate::config::DashboardConfig;
use crate::feeds::dashboard::DashboardSnapshot;
use crate::feeds::{
    Action, FeedData, FeedMessage, FetchRequest, GenerationCounter, Request, RequestKind,
};
use crate::ui::format::{self, QualityTier};
use crate::ui::toast::{ToastLevel, Toasts};
use crate::ui::widgets::FeedWidget;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};
use tracing::debug;

pub const WIDGET_ID: &str = "operations";

/// Schedule intervals `i` cycles through, in seconds.
const INTERVAL_PRESETS: [u64; 5] = [900, 1_800, 3_600, 21_600, 86_400];

/// Analytics, scheduler state and recent sessions, with scraper controls.
pub struct OperationsDashboard {
    config: DashboardConfig,
    snapshot: DashboardSnapshot,
    loaded: bool,
    loading: bool,
    scraping: bool,
    generations: GenerationCounter,
    next_refresh: Option<Instant>,
    refresh_due: Option<Instant>,
    scroll_state: ListState,
    toasts: Toasts,
    selected: bool,
}

impl OperationsDashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let mut scroll_state = ListState::default();
        scroll_state.select(Some(0));

        Self {
            config,
            snapshot: DashboardSnapshot::default(),
            loaded: false,
            loading: false,
            scraping: false,
            generations: GenerationCounter::default(),
            next_refresh: None,
            refresh_due: None,
            scroll_state,
            toasts: Toasts::default(),
            selected: false,
        }
    }

    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_scraping(&self) -> bool {
        self.scraping
    }

    pub fn refresh_at(&mut self, now: Instant) -> FetchRequest {
        self.loading = true;
        self.refresh_due = None;
        self.next_refresh = Some(now + self.config.refresh_interval());
        FetchRequest {
            widget_id: WIDGET_ID.to_string(),
            generation: self.generations.advance(),
            request: Request::Dashboard {
                session_limit: self.config.session_limit,
            },
        }
    }

    pub fn run_scraper(&mut self) -> Option<FetchRequest> {
        if self.scraping {
            self.toasts
                .push(ToastLevel::Info, "Scraping already in progress");
            return None;
        }
        self.scraping = true;
        self.toasts.push(ToastLevel::Info, "Scraping started...");
        Some(self.action(Action::RunScraper))
    }

    pub fn toggle_scheduler(&mut self) -> FetchRequest {
        let action = self.snapshot.toggle_action();
        self.action(action)
    }

    /// Moves the schedule interval to the next preset and saves it.
    pub fn cycle_interval(&mut self) -> Option<FetchRequest> {
        let Some(settings) = &self.snapshot.settings else {
            self.toasts
                .push(ToastLevel::Error, "Scraper settings not loaded yet");
            return None;
        };
        let next = next_interval(settings.schedule_interval);
        let updated = ScraperSettings {
            schedule_interval: next,
            ..settings.clone()
        };
        Some(self.action(Action::UpdateSettings(updated)))
    }

    fn action(&self, action: Action) -> FetchRequest {
        FetchRequest {
            widget_id: WIDGET_ID.to_string(),
            generation: self.generations.current(),
            request: Request::Action(action),
        }
    }

    fn schedule_refresh(&mut self, delay: Duration) {
        self.refresh_due = Some(Instant::now() + delay);
    }

    fn apply_snapshot(&mut self, snapshot: DashboardSnapshot) {
        if !snapshot.unavailable.is_empty() && snapshot.unavailable != self.snapshot.unavailable {
            self.toasts.push(
                ToastLevel::Error,
                format!("Unavailable: {}", snapshot.unavailable.join(", ")),
            );
        }
        self.snapshot = snapshot;
        self.loaded = true;
        self.loading = false;

        let max = self.snapshot.sessions.len().saturating_sub(1);
        if let Some(selected) = self.scroll_state.selected() {
            self.scroll_state.select(Some(selected.min(max)));
        }
    }

    fn apply_error(&mut self, kind: RequestKind, message: String) {
        let text = match kind {
            RequestKind::Scrape => {
                // The backend records the session even when the call fails.
                self.scraping = false;
                self.schedule_refresh(self.config.scrape_refresh_delay());
                format!("Scraping failed: {}", message)
            }
            RequestKind::Scheduler => format!("Scheduler update failed: {}", message),
            RequestKind::Settings => format!("Saving settings failed: {}", message),
            RequestKind::Health => format!("Health check failed: {}", message),
            RequestKind::Dashboard | RequestKind::Tweets => {
                self.loading = false;
                format!("Refresh failed: {}", message)
            }
        };
        self.toasts.push(ToastLevel::Error, text);
    }
}

fn next_interval(current: u64) -> u64 {
    INTERVAL_PRESETS
        .iter()
        .copied()
        .find(|preset| *preset > current)
        .unwrap_or(INTERVAL_PRESETS[0])
}

impl FeedWidget for OperationsDashboard {
    fn id(&self) -> String {
        WIDGET_ID.to_string()
    }

    fn title(&self) -> &str {
        &self.config.title
    }

    fn render(&self, frame: &mut Frame, area: Rect, selected: bool) {
        let border_style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };

        let title = if self.loading {
            format!(" {} (refreshing) ", self.config.title)
        } else {
            format!(" {} ", self.config.title)
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if !self.loaded {
            frame.render_widget(Paragraph::new("Loading dashboard..."), inner);
            self.toasts.render(frame, area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Min(6),
                Constraint::Length(1),
            ])
            .split(inner);

        self.render_stats(frame, rows[0]);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        self.render_sentiment(frame, middle[0]);
        self.render_categories(frame, middle[1]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        self.render_sessions(frame, bottom[0]);
        self.render_settings(frame, bottom[1]);

        let help = Line::from(Span::styled(
            "x run scraping  p start/stop scheduler  i change interval  r refresh  j/k sessions",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(help), rows[3]);

        self.toasts.render(frame, area);
    }

    fn start(&mut self) -> Vec<FetchRequest> {
        vec![
            self.refresh_at(Instant::now()),
            self.action(Action::Health),
        ]
    }

    fn update_data(&mut self, message: FeedMessage) {
        match message.data {
            FeedData::Dashboard(snapshot) => {
                if !self.generations.is_current(message.generation) {
                    debug!(
                        generation = message.generation.value(),
                        "dropping stale dashboard snapshot"
                    );
                    return;
                }
                self.apply_snapshot(snapshot);
            }
            FeedData::ScrapeFinished(session) => {
                self.scraping = false;
                match session.status_kind() {
                    SessionStatus::Failed => self.toasts.push(
                        ToastLevel::Error,
                        format!(
                            "Scraping session failed: {}",
                            session.errors.first().map_or("no details", String::as_str)
                        ),
                    ),
                    _ => self.toasts.push(
                        ToastLevel::Success,
                        format!(
                            "Scraping finished: {} tweets processed",
                            session.tweets_processed
                        ),
                    ),
                }
                self.schedule_refresh(self.config.scrape_refresh_delay());
            }
            FeedData::SchedulerChanged { running, message } => {
                let text = if message.is_empty() {
                    if running {
                        "Scheduler started".to_string()
                    } else {
                        "Scheduler stopped".to_string()
                    }
                } else {
                    message
                };
                self.toasts.push(ToastLevel::Success, text);
                self.schedule_refresh(Duration::ZERO);
            }
            FeedData::SettingsSaved(settings) => {
                self.toasts.push(
                    ToastLevel::Success,
                    format!(
                        "Schedule interval set to {}",
                        format::interval(settings.schedule_interval)
                    ),
                );
                self.snapshot.settings = Some(settings);
                self.schedule_refresh(Duration::ZERO);
            }
            FeedData::Health(reply) => {
                debug!(reply = %reply, "backend health check passed");
                self.toasts
                    .push(ToastLevel::Info, format!("Connected: {}", reply));
            }
            FeedData::Error { kind, message } => self.apply_error(kind, message),
            FeedData::TweetPage { .. } => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<FetchRequest> {
        match key.code {
            KeyCode::Char('x') => self.run_scraper().into_iter().collect(),
            KeyCode::Char('p') => vec![self.toggle_scheduler()],
            KeyCode::Char('i') => self.cycle_interval().into_iter().collect(),
            KeyCode::Char('r') => vec![self.refresh_at(Instant::now())],
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll_up();
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll_down();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn tick(&mut self, now: Instant) -> Vec<FetchRequest> {
        self.toasts.prune(now);

        // A periodic tick never supersedes a snapshot still in flight.
        let due = self.refresh_due.is_some_and(|at| now >= at)
            || (!self.loading && self.next_refresh.is_some_and(|at| now >= at));
        if due {
            vec![self.refresh_at(now)]
        } else {
            Vec::new()
        }
    }

    fn scroll_up(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected > 0 {
                self.scroll_state.select(Some(selected - 1));
            }
        }
    }

    fn scroll_down(&mut self) {
        if let Some(selected) = self.scroll_state.selected() {
            if selected < self.snapshot.sessions.len().saturating_sub(1) {
                self.scroll_state.select(Some(selected + 1));
            }
        }
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl OperationsDashboard {
    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        let analytics = self.snapshot.analytics.clone().unwrap_or_default();
        let quality_tier = QualityTier::from_score(analytics.avg_quality_score);
        let running = self.snapshot.scheduler_running();

        let stats = [
            (
                "Total tweets",
                analytics.total_tweets.to_string(),
                Style::default().fg(Color::White),
            ),
            (
                "Avg quality",
                format::percent(analytics.avg_quality_score),
                Style::default().fg(quality_tier.color()),
            ),
            (
                "Avg engagement",
                format::percent(analytics.avg_engagement_score),
                Style::default().fg(Color::Cyan),
            ),
            (
                "Scheduler",
                if running { "Running" } else { "Stopped" }.to_string(),
                Style::default().fg(if running { Color::Green } else { Color::Red }),
            ),
        ];

        for ((label, value, style), cell) in stats.into_iter().zip(cells.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(label);
            let paragraph = Paragraph::new(Line::from(Span::styled(
                value,
                style.add_modifier(Modifier::BOLD),
            )))
            .block(block);
            frame.render_widget(paragraph, *cell);
        }
    }

    fn render_sentiment(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title("Sentiment");

        let distribution = self
            .snapshot
            .analytics
            .as_ref()
            .map(|a| a.sentiment_distribution.clone())
            .unwrap_or_default();
        let total: u64 = distribution.values().sum();
        let bar_width = area.width.saturating_sub(24).max(1) as u64;

        let items: Vec<ListItem> = if distribution.is_empty() {
            vec![ListItem::new("No data")]
        } else {
            distribution
                .iter()
                .map(|(label, count)| {
                    let filled = if total == 0 {
                        0
                    } else {
                        (count * bar_width / total) as usize
                    };
                    let color = format::sentiment_color(SentimentLabel::from_label(label));
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:<10}", label), Style::default().fg(color)),
                        Span::styled("█".repeat(filled), Style::default().fg(color)),
                        Span::raw(format!(" {}", count)),
                    ]))
                })
                .collect()
        };

        frame.render_widget(List::new(items).block(block), area);
    }

    fn render_categories(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title("Top categories");

        let categories = self
            .snapshot
            .analytics
            .as_ref()
            .map(|a| a.top_categories.as_slice())
            .unwrap_or_default();

        let items: Vec<ListItem> = if categories.is_empty() {
            vec![ListItem::new("No data")]
        } else {
            categories
                .iter()
                .map(|c| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:<20}", format::truncate(&c.category, 20)),
                            Style::default().fg(Color::White),
                        ),
                        Span::styled(c.count.to_string(), Style::default().fg(Color::Cyan)),
                    ]))
                })
                .collect()
        };

        frame.render_widget(List::new(items).block(block), area);
    }

    fn render_sessions(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(if self.scraping {
                "Recent sessions (scraping...)"
            } else {
                "Recent sessions"
            });

        if self.snapshot.sessions.is_empty() {
            frame.render_widget(List::new(vec![ListItem::new("No sessions yet")]).block(block), area);
            return;
        }

        let now = Utc::now();
        let items: Vec<ListItem> = self
            .snapshot
            .sessions
            .iter()
            .map(|session| {
                let status = session.status_kind();
                let status_text = if session.status.is_empty() {
                    "unknown"
                } else {
                    session.status.as_str()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<10}", status_text),
                        format::session_status_style(status),
                    ),
                    Span::styled(
                        format!("{:>5} tweets  ", session.tweets_processed),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(
                        format::relative_time(session.started_at, now),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

        let mut state = self.scroll_state.clone();
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_settings(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title("Scraper");
        let label = Style::default().fg(Color::DarkGray);

        let mut lines = match &self.snapshot.settings {
            Some(s) => vec![
                Line::from(vec![
                    Span::styled("Interval:    ", label),
                    Span::raw(format::interval(s.schedule_interval)),
                ]),
                Line::from(vec![
                    Span::styled("Max retries: ", label),
                    Span::raw(s.max_retries.to_string()),
                ]),
                Line::from(vec![
                    Span::styled("Retry delay: ", label),
                    Span::raw(format::interval(s.retry_delay)),
                ]),
                Line::from(vec![
                    Span::styled("Batch size:  ", label),
                    Span::raw(s.batch_size.to_string()),
                ]),
            ],
            None => vec![Line::from("Settings unavailable")],
        };

        if let Some(next_run) = self.snapshot.scheduler.as_ref().and_then(|s| s.next_run) {
            lines.push(Line::from(vec![
                Span::styled("Next run:    ", label),
                Span::raw(next_run.format("%H:%M UTC").to_string()),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
