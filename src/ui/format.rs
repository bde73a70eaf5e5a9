//! Display helpers shared by the widgets.

use crate::api::models::SentimentLabel;
use crate::api::models::SessionStatus;
use chrono::{DateTime, Utc};
use ratatui::style::{Color, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    /// Boundaries are inclusive: 0.8 is high, 0.6 is medium.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::High => Color::Green,
            Self::Medium => Color::Yellow,
            Self::Low => Color::Red,
        }
    }
}

pub fn sentiment_color(sentiment: SentimentLabel) -> Color {
    match sentiment {
        SentimentLabel::Positive => Color::Green,
        SentimentLabel::Negative => Color::Red,
        SentimentLabel::Neutral => Color::Gray,
    }
}

pub fn session_status_style(status: SessionStatus) -> Style {
    match status {
        SessionStatus::Completed => Style::default().fg(Color::Green),
        SessionStatus::Failed => Style::default().fg(Color::Red),
        SessionStatus::Running => Style::default().fg(Color::Yellow),
    }
}

/// `0.853` -> `"85%"`.
pub fn percent(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

pub fn relative_time(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "unknown".to_string();
    };

    let secs = (now - ts).num_seconds();
    if secs < 0 {
        return ts.format("%Y-%m-%d").to_string();
    }
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        86_400..=604_799 => format!("{}d ago", secs / 86_400),
        _ => ts.format("%Y-%m-%d").to_string(),
    }
}

pub fn interval(secs: u64) -> String {
    match secs {
        0 => "off".to_string(),
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}

/// Cuts `text` to at most `max` characters, ending in `…` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}
