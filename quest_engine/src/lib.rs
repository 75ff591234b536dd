#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const QUEST_ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Script languages
pub mod command;
pub mod condition;
pub mod expr;
pub mod text;

// Quest model
pub mod action;
pub mod graph;
pub mod inventory;
pub mod item;
pub mod recipe;
pub mod relay;
pub mod screen;

// Loading and running
pub mod catalog;
pub mod config;
pub mod console;
pub mod data_paths;
pub mod events;
pub mod loader;
pub mod session;

// Re-exports for convenience
pub use catalog::QuestCatalog;
pub use config::{EngineConfig, load_config};
pub use console::run_console;
pub use expr::Value;
pub use graph::QuestGraph;
pub use loader::{LoadReport, LoadWarning, build_graph, load_graph, load_quest};
pub use screen::{Choice, Screen};
pub use session::{QuestSession, SessionError, SessionState};
