use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

impl ToastLevel {
    fn color(self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Success => Color::Green,
            Self::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
    expires_at: Instant,
}

/// Short-lived notifications drawn over the bottom of a widget.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
    items: VecDeque<Toast>,
}

impl Toasts {
    pub fn push(&mut self, level: ToastLevel, text: impl Into<String>) {
        self.push_at(level, text, Instant::now());
    }

    pub fn push_at(&mut self, level: ToastLevel, text: impl Into<String>, now: Instant) {
        if self.items.len() == MAX_TOASTS {
            self.items.pop_front();
        }
        self.items.push_back(Toast {
            level,
            text: text.into(),
            expires_at: now + TOAST_TTL,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut bottom = area.y + area.height.saturating_sub(1);
        for toast in self.items.iter().rev() {
            if bottom < area.y + 3 {
                break;
            }
            let toast_area = Rect::new(
                area.x + 2,
                bottom - 3,
                area.width.saturating_sub(4),
                3,
            );
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(toast.level.color()));
            let paragraph = Paragraph::new(toast.text.as_str())
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(Clear, toast_area);
            frame.render_widget(paragraph, toast_area);
            bottom -= 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire() {
        let start = Instant::now();
        let mut toasts = Toasts::default();
        toasts.push_at(ToastLevel::Info, "Scraping started", start);
        toasts.prune(start + Duration::from_secs(1));
        assert!(!toasts.is_empty());
        toasts.prune(start + TOAST_TTL + Duration::from_millis(1));
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_toasts_are_bounded() {
        let mut toasts = Toasts::default();
        for i in 0..5 {
            toasts.push(ToastLevel::Error, format!("error {}", i));
        }
        let texts: Vec<&str> = toasts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["error 2", "error 3", "error 4"]);
    }
}
