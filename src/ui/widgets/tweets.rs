use crate::api::models::{ProcessedTweet, SentimentLabel, TweetFilters};
use crate::config::BrowserConfig;
use crate::feeds::{FeedData, FeedMessage, FetchRequest, Generation, GenerationCounter, Request};
use crate::ui::format::{self, QualityTier};
use crate::ui::toast::{ToastLevel, Toasts};
use crate::ui::widgets::{center_rect, FeedWidget};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;
use tracing::{debug, warn};

pub const WIDGET_ID: &str = "tweets";

const CARD_HEIGHT: u16 = 8;
const CARD_MIN_WIDTH: u16 = 40;
const QUALITY_FLOORS: [f64; 3] = [0.4, 0.6, 0.8];

/// A single edit to the browser filters.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Query(String),
    Author(String),
    Category(String),
    Sentiment(Option<SentimentLabel>),
    Media(Option<bool>),
    Thread(Option<bool>),
    MinQuality(Option<f64>),
    PageSize(u32),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Query,
    Author,
    Category,
}

impl TextField {
    fn label(self) -> &'static str {
        match self {
            Self::Query => "text",
            Self::Author => "author",
            Self::Category => "category",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BrowserMode {
    Normal,
    Editing(TextField),
}

#[derive(Debug, Clone, Copy)]
struct PendingPage {
    generation: Generation,
    offset: u32,
}

/// Filterable, paginated card grid of analysed tweets.
pub struct TweetBrowser {
    config: BrowserConfig,
    filters: TweetFilters,
    tweets: Vec<ProcessedTweet>,
    loading: bool,
    exhausted: bool,
    selected_index: usize,
    detail: Option<ProcessedTweet>,
    mode: BrowserMode,
    input: String,
    generations: GenerationCounter,
    pending: Option<PendingPage>,
    toasts: Toasts,
    selected: bool,
}

impl TweetBrowser {
    pub fn new(config: BrowserConfig) -> Self {
        let filters = TweetFilters::with_page_size(config.page_size.max(1));
        Self {
            config,
            filters,
            tweets: Vec::new(),
            loading: false,
            exhausted: false,
            selected_index: 0,
            detail: None,
            mode: BrowserMode::Normal,
            input: String::new(),
            generations: GenerationCounter::default(),
            pending: None,
            toasts: Toasts::default(),
            selected: false,
        }
    }

    pub fn filters(&self) -> &TweetFilters {
        &self.filters
    }

    pub fn tweets(&self) -> &[ProcessedTweet] {
        &self.tweets
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn detail(&self) -> Option<&ProcessedTweet> {
        self.detail.as_ref()
    }

    /// Applies a filter edit. Pagination always restarts from the top.
    pub fn change_filter(&mut self, change: FilterChange) -> FetchRequest {
        let filters = &mut self.filters;
        match change {
            FilterChange::Query(q) => filters.query = non_blank(q),
            FilterChange::Author(a) => filters.author = non_blank(a),
            FilterChange::Category(c) => filters.category = non_blank(c),
            FilterChange::Sentiment(s) => filters.sentiment = s.map(|s| s.as_str().to_string()),
            FilterChange::Media(m) => filters.has_media = m,
            FilterChange::Thread(t) => filters.is_thread = t,
            FilterChange::MinQuality(q) => filters.min_quality_score = q,
            FilterChange::PageSize(n) => filters.limit = n.max(1),
            FilterChange::Clear => {
                *filters = TweetFilters::with_page_size(filters.limit);
            }
        }
        self.filters.offset = 0;
        self.exhausted = false;
        self.issue(0, false)
    }

    /// Refetches the first page with the current filters.
    pub fn refresh(&mut self) -> FetchRequest {
        self.exhausted = false;
        self.issue(0, false)
    }

    /// Requests the page after the last one shown. `None` while another
    /// page is in flight, and once the backend has returned a short page.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if self.pending.is_some() {
            self.toasts.push(ToastLevel::Info, "Still loading...");
            return None;
        }
        if self.exhausted {
            self.toasts.push(ToastLevel::Info, "No more tweets");
            return None;
        }
        let offset = self.filters.offset + self.filters.limit;
        Some(self.issue(offset, true))
    }

    pub fn open_detail(&mut self) {
        self.detail = self.tweets.get(self.selected_index).cloned();
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    fn issue(&mut self, offset: u32, append: bool) -> FetchRequest {
        let generation = self.generations.advance();
        self.pending = Some(PendingPage { generation, offset });
        self.loading = true;

        let mut filters = self.filters.clone();
        filters.offset = offset;
        FetchRequest {
            widget_id: WIDGET_ID.to_string(),
            generation,
            request: Request::Tweets { filters, append },
        }
    }

    fn apply_page(&mut self, generation: Generation, tweets: Vec<ProcessedTweet>, append: bool) {
        let offset = self
            .pending
            .take()
            .filter(|p| p.generation == generation)
            .map_or(0, |p| p.offset);

        self.loading = false;
        self.exhausted = (tweets.len() as u32) < self.filters.limit;
        self.filters.offset = offset;

        if append {
            if tweets.is_empty() {
                self.toasts.push(ToastLevel::Info, "No more tweets");
            }
            self.tweets.extend(tweets);
        } else {
            self.tweets = tweets;
            self.selected_index = 0;
        }
    }

    fn begin_edit(&mut self, field: TextField) {
        let current = match field {
            TextField::Query => &self.filters.query,
            TextField::Author => &self.filters.author,
            TextField::Category => &self.filters.category,
        };
        self.input = current.clone().unwrap_or_default();
        self.mode = BrowserMode::Editing(field);
    }

    fn handle_edit_key(&mut self, field: TextField, key: KeyEvent) -> Vec<FetchRequest> {
        match key.code {
            KeyCode::Esc => {
                self.mode = BrowserMode::Normal;
                self.input.clear();
                Vec::new()
            }
            KeyCode::Enter => {
                self.mode = BrowserMode::Normal;
                let value = std::mem::take(&mut self.input);
                let change = match field {
                    TextField::Query => FilterChange::Query(value),
                    TextField::Author => FilterChange::Author(value),
                    TextField::Category => FilterChange::Category(value),
                };
                vec![self.change_filter(change)]
            }
            KeyCode::Backspace => {
                self.input.pop();
                Vec::new()
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn open_selected_url(&mut self) {
        let url = self
            .detail
            .as_ref()
            .or_else(|| self.tweets.get(self.selected_index))
            .map(|t| t.tweet_data.url.clone())
            .filter(|u| !u.is_empty());

        match url {
            Some(url) => {
                if let Err(e) = open::that(&url) {
                    warn!(url, error = %e, "failed to open tweet in browser");
                    self.toasts
                        .push(ToastLevel::Error, format!("Could not open {}", url));
                }
            }
            None => self.toasts.push(ToastLevel::Info, "Tweet has no URL"),
        }
    }

    fn current_sentiment(&self) -> Option<SentimentLabel> {
        self.filters
            .sentiment
            .as_deref()
            .map(SentimentLabel::from_label)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn next_sentiment(current: Option<SentimentLabel>) -> Option<SentimentLabel> {
    match current {
        None => Some(SentimentLabel::Positive),
        Some(SentimentLabel::Positive) => Some(SentimentLabel::Negative),
        Some(SentimentLabel::Negative) => Some(SentimentLabel::Neutral),
        Some(SentimentLabel::Neutral) => None,
    }
}

fn next_tristate(current: Option<bool>) -> Option<bool> {
    match current {
        None => Some(true),
        Some(true) => Some(false),
        Some(false) => None,
    }
}

fn next_quality_floor(current: Option<f64>) -> Option<f64> {
    match current {
        None => Some(QUALITY_FLOORS[0]),
        Some(q) => QUALITY_FLOORS.iter().copied().find(|f| *f > q + f64::EPSILON),
    }
}

fn tristate_label(value: Option<bool>, yes: &'static str, no: &'static str) -> &'static str {
    match value {
        None => "any",
        Some(true) => yes,
        Some(false) => no,
    }
}

impl FeedWidget for TweetBrowser {
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

        let block = Block::default()
            .title(format!(" {} ", self.config.title))
            .borders(Borders::ALL)
            .border_style(border_style);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(Paragraph::new(self.filter_line()), chunks[0]);

        if self.loading && self.tweets.is_empty() {
            let loading = Paragraph::new("Loading tweets...").alignment(Alignment::Center);
            frame.render_widget(loading, chunks[1]);
        } else if self.tweets.is_empty() {
            let empty = Paragraph::new("No tweets match these filters.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, chunks[1]);
        } else {
            self.render_grid(frame, chunks[1]);
        }

        frame.render_widget(Paragraph::new(self.status_line()), chunks[2]);

        if let BrowserMode::Editing(field) = self.mode {
            self.render_edit_modal(frame, area, field);
        }

        if let Some(tweet) = &self.detail {
            self.render_detail(frame, area, tweet);
        }

        self.toasts.render(frame, area);
    }

    fn start(&mut self) -> Vec<FetchRequest> {
        vec![self.refresh()]
    }

    fn update_data(&mut self, message: FeedMessage) {
        if !self.generations.is_current(message.generation) {
            debug!(
                generation = message.generation.value(),
                current = self.generations.current().value(),
                "dropping stale tweet page"
            );
            return;
        }

        match message.data {
            FeedData::TweetPage { tweets, append } => {
                self.apply_page(message.generation, tweets, append);
            }
            FeedData::Error { message, .. } => {
                self.loading = false;
                self.pending = None;
                self.toasts
                    .push(ToastLevel::Error, format!("Failed to load tweets: {}", message));
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<FetchRequest> {
        if let BrowserMode::Editing(field) = self.mode {
            return self.handle_edit_key(field, key);
        }

        if self.detail.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => self.close_detail(),
                KeyCode::Char('o') => self.open_selected_url(),
                _ => {}
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(),
            KeyCode::Enter => self.open_detail(),
            KeyCode::Char('o') => self.open_selected_url(),
            KeyCode::Char('/') => self.begin_edit(TextField::Query),
            KeyCode::Char('a') => self.begin_edit(TextField::Author),
            KeyCode::Char('c') => self.begin_edit(TextField::Category),
            KeyCode::Char('s') => {
                let next = next_sentiment(self.current_sentiment());
                return vec![self.change_filter(FilterChange::Sentiment(next))];
            }
            KeyCode::Char('m') => {
                let next = next_tristate(self.filters.has_media);
                return vec![self.change_filter(FilterChange::Media(next))];
            }
            KeyCode::Char('t') => {
                let next = next_tristate(self.filters.is_thread);
                return vec![self.change_filter(FilterChange::Thread(next))];
            }
            KeyCode::Char('f') => {
                let next = next_quality_floor(self.filters.min_quality_score);
                return vec![self.change_filter(FilterChange::MinQuality(next))];
            }
            KeyCode::Char('x') => return vec![self.change_filter(FilterChange::Clear)],
            KeyCode::Char('n') => return self.load_more().into_iter().collect(),
            KeyCode::Char('r') => return vec![self.refresh()],
            _ => {}
        }
        Vec::new()
    }

    fn tick(&mut self, now: Instant) -> Vec<FetchRequest> {
        self.toasts.prune(now);
        Vec::new()
    }

    fn scroll_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    fn scroll_down(&mut self) {
        if self.selected_index < self.tweets.len().saturating_sub(1) {
            self.selected_index += 1;
        }
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn is_capturing_input(&self) -> bool {
        self.mode != BrowserMode::Normal
    }
}

impl TweetBrowser {
    fn filter_line(&self) -> Line<'_> {
        let label = Style::default().fg(Color::DarkGray);
        let value = Style::default().fg(Color::Cyan);
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

        Line::from(vec![
            Span::styled("Text: ", label),
            Span::styled(text(&self.filters.query), value),
            Span::styled("  Author: ", label),
            Span::styled(text(&self.filters.author), value),
            Span::styled("  Category: ", label),
            Span::styled(text(&self.filters.category), value),
            Span::styled("  Sentiment: ", label),
            Span::styled(
                self.current_sentiment()
                    .map_or("all", SentimentLabel::as_str),
                value,
            ),
            Span::styled("  Media: ", label),
            Span::styled(tristate_label(self.filters.has_media, "with", "without"), value),
            Span::styled("  Thread: ", label),
            Span::styled(tristate_label(self.filters.is_thread, "only", "none"), value),
            Span::styled("  Quality >= ", label),
            Span::styled(
                self.filters
                    .min_quality_score
                    .map_or_else(|| "-".to_string(), format::percent),
                value,
            ),
        ])
    }

    fn status_line(&self) -> Line<'_> {
        let count = match self.tweets.len() {
            1 => "1 tweet".to_string(),
            n => format!("{} tweets", n),
        };
        let state = if self.loading {
            " · loading..."
        } else if self.exhausted {
            " · end of results"
        } else {
            ""
        };

        Line::from(vec![
            Span::styled(
                format!("{} · page size {}{}", count, self.filters.limit, state),
                Style::default().fg(Color::White),
            ),
            Span::styled(
                "   / text  a author  c category  s sentiment  m media  t thread  f quality  x clear  n more  Enter detail",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    }

    fn render_grid(&self, frame: &mut Frame, area: Rect) {
        let columns = (area.width / CARD_MIN_WIDTH).clamp(1, 3) as usize;
        let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
        let selected_row = self.selected_index / columns;
        let first_row = (selected_row + 1).saturating_sub(visible_rows);

        let card_width = area.width / columns as u16;
        let start = first_row * columns;
        let end = (start + visible_rows * columns).min(self.tweets.len());
        let now = Utc::now();

        for (slot, idx) in (start..end).enumerate() {
            let row = (slot / columns) as u16;
            let col = (slot % columns) as u16;
            let y = area.y + row * CARD_HEIGHT;
            if y >= area.y + area.height {
                break;
            }
            let card_area = Rect::new(
                area.x + col * card_width,
                y,
                card_width,
                CARD_HEIGHT.min(area.y + area.height - y),
            );
            self.render_card(frame, card_area, &self.tweets[idx], idx == self.selected_index, now);
        }
    }

    fn render_card(
        &self,
        frame: &mut Frame,
        area: Rect,
        tweet: &ProcessedTweet,
        highlighted: bool,
        now: chrono::DateTime<Utc>,
    ) {
        let border = if highlighted {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default().borders(Borders::ALL).border_style(border);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let data = &tweet.tweet_data;
        let width = inner.width.max(1) as usize;

        let mut header = vec![
            Span::styled(
                data.author.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" · {}", format::relative_time(data.created_at, now)),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if data.media_features.has_media {
            header.push(Span::styled(" [MEDIA]", Style::default().fg(Color::Magenta)));
        }
        if data.media_features.is_thread {
            header.push(Span::styled(" [THREAD]", Style::default().fg(Color::Blue)));
        }

        let mut lines = vec![Line::from(header)];

        let wrapped = textwrap::wrap(&data.text, width);
        for (i, segment) in wrapped.iter().take(3).enumerate() {
            let segment = if i == 2 && wrapped.len() > 3 {
                format::truncate(&format!("{}…", segment), width)
            } else {
                segment.to_string()
            };
            lines.push(Line::from(Span::styled(
                segment,
                Style::default().fg(Color::White),
            )));
        }
        while lines.len() < 4 {
            lines.push(Line::from(""));
        }

        match &tweet.ai_analysis {
            Some(analysis) => {
                let sentiment = analysis.sentiment.kind();
                let tier = QualityTier::from_score(analysis.quality_score);
                let mut spans = vec![
                    Span::styled(
                        sentiment.as_str(),
                        Style::default().fg(format::sentiment_color(sentiment)),
                    ),
                    Span::raw(" · "),
                    Span::styled(
                        format!(
                            "quality {} ({})",
                            format::percent(analysis.quality_score),
                            tier.label()
                        ),
                        Style::default().fg(tier.color()),
                    ),
                ];
                if !analysis.topic.is_empty() {
                    spans.push(Span::styled(
                        format!(" · {}", analysis.topic),
                        Style::default().fg(Color::White),
                    ));
                }
                lines.push(Line::from(spans));

                if !analysis.categories.is_empty() {
                    let tags = analysis
                        .categories
                        .iter()
                        .map(|c| format!("#{}", c))
                        .collect::<Vec<_>>()
                        .join(" ");
                    lines.push(Line::from(Span::styled(
                        format::truncate(&tags, width),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "not analysed yet",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ))),
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_edit_modal(&self, frame: &mut Frame, area: Rect, field: TextField) {
        let modal_area = center_rect(60, 20, area);
        frame.render_widget(Clear, modal_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!("Filter by {}", field.label()));
        let inner = block.inner(modal_area);
        frame.render_widget(block, modal_area);

        let text = vec![
            Line::from(""),
            Line::from(format!("{}: {}_", field.label(), self.input)),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to apply | Esc to cancel | empty clears",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(text), inner);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, tweet: &ProcessedTweet) {
        let modal_area = center_rect(80, 80, area);
        frame.render_widget(Clear, modal_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Tweet detail");
        let inner = block.inner(modal_area);
        frame.render_widget(block, modal_area);

        let data = &tweet.tweet_data;
        let label = Style::default().fg(Color::DarkGray);
        let posted = data
            .created_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    data.author.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {} ({})", posted, format::relative_time(data.created_at, Utc::now())),
                    label,
                ),
            ]),
            Line::from(Span::styled(data.url.clone(), label)),
            Line::from(""),
        ];
        for segment in textwrap::wrap(&data.text, inner.width.max(1) as usize) {
            lines.push(Line::from(segment.to_string()));
        }
        lines.push(Line::from(""));

        match &tweet.ai_analysis {
            Some(a) => {
                let sentiment = a.sentiment.kind();
                let tier = QualityTier::from_score(a.quality_score);
                lines.push(Line::from(vec![
                    Span::styled("Sentiment:  ", label),
                    Span::styled(
                        format!("{} ({} confidence)", sentiment, format::percent(a.sentiment.confidence)),
                        Style::default().fg(format::sentiment_color(sentiment)),
                    ),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Quality:    ", label),
                    Span::styled(
                        format!("{} ({})", format::percent(a.quality_score), tier.label()),
                        Style::default().fg(tier.color()),
                    ),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Engagement: ", label),
                    Span::raw(format::percent(a.engagement_prediction)),
                ]));
                for (name, value) in [
                    ("Topic:      ", a.topic.clone()),
                    ("Intent:     ", a.intent.clone()),
                    ("Categories: ", a.categories.join(", ")),
                    ("Entities:   ", a.entities.join(", ")),
                ] {
                    if !value.is_empty() {
                        lines.push(Line::from(vec![Span::styled(name, label), Span::raw(value)]));
                    }
                }
                if !a.key_insights.is_empty() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled("Key insights", label)));
                    for insight in &a.key_insights {
                        lines.push(Line::from(format!("  • {}", insight)));
                    }
                }
            }
            None => lines.push(Line::from(Span::styled("Not analysed yet.", label))),
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Esc to close | o to open in browser",
            Style::default().fg(Color::DarkGray),
        )));

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);
    }
}
