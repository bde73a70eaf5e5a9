pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod feeds;
pub mod logging;
pub mod ui;
