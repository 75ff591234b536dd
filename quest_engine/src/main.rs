#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! Console host for quest documents.
//!
//! Usage: `quest_engine [quest-file]`. Without an argument the quest is read
//! from `quest.json` in the data directory.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

use quest_engine::data_paths::data_path;
use quest_engine::{QuestCatalog, load_config, load_graph, run_console};

fn main() -> Result<()> {
    env_logger::init();

    let quest_path = env::args_os()
        .nth(1)
        .map_or_else(|| data_path("quest.json"), PathBuf::from);
    let config = load_config(&data_path("engine.toml"));

    info!("Start: loading quest from '{}'", quest_path.display());
    let (graph, report) = load_graph(&quest_path).context("while loading quest")?;
    for warning in &report.warnings {
        eprintln!("{} {warning}", "warning:".yellow());
    }

    let mut catalog = QuestCatalog::new(config);
    let name = catalog.register(graph).internal_name().to_string();
    let mut session = catalog
        .new_session(&name)
        .with_context(|| format!("quest '{name}' missing from catalog"))?;

    let title = catalog.get(&name).map(|g| g.title().to_string()).unwrap_or_default();
    println!("{:^80}", title.to_uppercase().bright_yellow().underline());

    run_console(&mut session)
}
