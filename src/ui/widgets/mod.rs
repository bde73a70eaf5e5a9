pub mod operations;
pub mod tweets;

use crate::feeds::{FeedMessage, FetchRequest};
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};
use std::time::Instant;

/// A dashboard pane. Widgets own their state outright; they never talk to
/// the backend themselves but hand back [`FetchRequest`]s for the app to run.
pub trait FeedWidget {
    fn id(&self) -> String;
    fn title(&self) -> &str;
    fn render(&self, frame: &mut Frame, area: Rect, selected: bool);

    /// Requests to issue the first time the widget is shown.
    fn start(&mut self) -> Vec<FetchRequest>;

    /// Applies a fetch result. Results from superseded requests are ignored.
    fn update_data(&mut self, message: FeedMessage);

    fn handle_key(&mut self, key: KeyEvent) -> Vec<FetchRequest>;

    /// Called on every loop iteration for timers and toast expiry.
    fn tick(&mut self, now: Instant) -> Vec<FetchRequest>;

    fn scroll_up(&mut self);
    fn scroll_down(&mut self);
    fn set_selected(&mut self, selected: bool);

    /// True while the widget is taking text input, so global keys like `q`
    /// must not fire.
    fn is_capturing_input(&self) -> bool {
        false
    }
}

pub(crate) fn center_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
