pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod view;

pub use crate::core::*;
pub use config::ViewerConfig;
