//! User interface module
//!
//! Contains the TUI and the headless streaming front ends

pub mod stream;
pub mod tui;

// Re-export main types
pub use stream::{run_stream, StreamFormat};
pub use tui::{restore_terminal, setup_terminal, TuiApp};
