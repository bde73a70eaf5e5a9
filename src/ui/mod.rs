pub mod format;
pub mod toast;
pub mod widgets;
