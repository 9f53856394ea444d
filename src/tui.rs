//! Terminal user interface
//!
//! Renders [`crate::runtime::DebateSnapshot`]s with ratatui and turns key
//! presses into debate commands.

mod app;
mod view;

pub use app::TuiApp;
