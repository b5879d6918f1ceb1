pub mod config;
pub mod daemon;
pub mod prompts;
pub mod sync;
pub mod sync_ui;
