//! Loader utilities for building a `QuestGraph` from a quest document.
//!
//! Documents are read as JSON, TOML or RON depending on the file extension
//! and decode into `quest_data::QuestDef`. Building a graph never fails on
//! content problems: those are collected in a [`LoadReport`] and logged.

pub mod lint;

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use quest_data::{QuestDef, ValidationError};

use crate::expr::Value;
use crate::graph::QuestGraph;
use crate::item::{Item, ItemStack};
use crate::recipe::Recipe;
use crate::relay::Relay;
use crate::screen::Screen;

/// A non-fatal problem found while loading a quest.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Document-level problem: duplicate key, dangling reference or malformed recipe.
    Document(ValidationError),
    /// A command or guard that will misbehave at runtime.
    Script { context: String, message: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::Document(err) => write!(f, "{err}"),
            LoadWarning::Script { context, message } => write!(f, "{context}: {message}"),
        }
    }
}

/// Warnings gathered while building a graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Supported on-disk encodings of a quest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
    Ron,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "toml" => Some(DocumentFormat::Toml),
            "ron" => Some(DocumentFormat::Ron),
            _ => None,
        }
    }
}

/// Decode a quest document from text.
///
/// # Errors
/// Returns an error if the text is not a valid document in `format`.
pub fn parse_quest(text: &str, format: DocumentFormat) -> Result<QuestDef> {
    let def = match format {
        DocumentFormat::Json => serde_json::from_str(text).context("parsing quest JSON")?,
        DocumentFormat::Toml => toml::from_str(text).context("parsing quest TOML")?,
        DocumentFormat::Ron => ron::from_str(text).context("parsing quest RON")?,
    };
    Ok(def)
}

/// Read and decode a quest document, choosing the format by file extension.
///
/// # Errors
/// Unsupported extensions, IO errors and decoding errors.
pub fn load_quest(path: &Path) -> Result<QuestDef> {
    let Some(format) = DocumentFormat::from_path(path) else {
        bail!("unsupported quest file extension: '{}'", path.display());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading quest from '{}'", path.display()))?;
    parse_quest(&text, format).with_context(|| format!("while loading quest '{}'", path.display()))
}

/// Read a quest document and build its graph.
///
/// # Errors
/// IO and decoding errors only; content problems end up in the report.
pub fn load_graph(path: &Path) -> Result<(QuestGraph, LoadReport)> {
    let def = load_quest(path)?;
    Ok(build_graph(&def))
}

/// Build a graph from a decoded document and report what looks wrong with it.
pub fn build_graph(def: &QuestDef) -> (QuestGraph, LoadReport) {
    let mut report = LoadReport::default();
    report
        .warnings
        .extend(quest_data::validate_quest(def).into_iter().map(LoadWarning::Document));

    let mut graph = QuestGraph::new(&def.internal_name, &def.title, &def.start_screen);

    for (name, item) in &def.items {
        graph.add_item(Item::new(name, item.title()));
    }

    // malformed recipes and unknown recipe items are already in the report from validation
    for (name, recipe) in &def.recipes {
        if let Ok(parts) = recipe.parts() {
            if let Some((unknown, _)) = parts
                .ingredients
                .iter()
                .chain(&parts.results)
                .find(|(item, _)| graph.item(item).is_none())
            {
                warn!("skipping recipe '{name}': unknown item '{unknown}'");
                continue;
            }
            let stacks = |pairs: Vec<(String, u32)>| -> Vec<ItemStack> {
                pairs
                    .into_iter()
                    .map(|(item, amount)| ItemStack::new(item, amount))
                    .collect()
            };
            graph.add_recipe(Recipe {
                internal_name: name.clone(),
                ingredients: stacks(parts.ingredients),
                results: stacks(parts.results),
            });
        }
    }

    for (name, value) in &def.variables {
        graph.add_variable(name, Value::from(value));
    }

    for screen in &def.screens {
        graph.add_screen(Screen::from(screen));
    }

    for relay in &def.relays {
        graph.add_relay(Relay::from(relay));
    }

    report.warnings.extend(lint::lint_graph(&graph));

    info!(
        "quest '{}' built: {} screens, {} relays, {} items, {} recipes, {} variables",
        graph.internal_name(),
        graph.screens().len(),
        graph.relays().len(),
        graph.items().len(),
        graph.recipes().len(),
        graph.variable_defaults().len()
    );
    for warning in &report.warnings {
        warn!("quest '{}': {warning}", graph.internal_name());
    }

    (graph, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_QUEST: &str = r#"
internalName = "cave"
title = "The Cave"
startScreen = "mouth"

[items]
torch = "Torch"

[recipes]
bundle = "torch + torch = torch"

[variables]
lit = false

[[screens]]
internalName = "mouth"
title = "Cave mouth"
text = "It is dark."

[[screens.choices]]
title = "Light the torch"
condition = "item(torch) > 0"
action = ["set lit = true", "jump deep"]

[[screens]]
internalName = "deep"
title = "Deep"
text = ["Drip.", "Drip."]
"#;

    #[test]
    fn toml_documents_build_a_graph() {
        let def = parse_quest(TOML_QUEST, DocumentFormat::Toml).unwrap();
        let (graph, report) = build_graph(&def);
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(graph.start_screen(), "mouth");
        assert_eq!(graph.screens().len(), 2);
        assert_eq!(graph.variable_defaults()["lit"], Value::Bool(false));
        assert_eq!(graph.recipe("bundle").unwrap().ingredients, vec![ItemStack::new("torch", 2)]);
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/b.JSON")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Path::new("b.ron")), Some(DocumentFormat::Ron));
        assert_eq!(DocumentFormat::from_path(Path::new("b.txt")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn recipes_with_unknown_items_are_skipped_and_reported() {
        let def: QuestDef = serde_json::from_value(serde_json::json!({
            "internalName": "q",
            "startScreen": "s",
            "items": { "stick": "Stick" },
            "recipes": { "ghostly": "stick = ghost", "fine": "stick + stick = stick" },
            "screens": [{ "internalName": "s", "title": "S" }]
        }))
        .unwrap();
        let (graph, report) = build_graph(&def);
        assert!(graph.recipe("ghostly").is_none());
        assert!(graph.recipe("fine").is_some());
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            LoadWarning::Document(ValidationError::MissingReference { kind: "item", id, .. }) if id == "ghost"
        )));
    }

    #[test]
    fn malformed_recipes_are_skipped_and_reported() {
        let def = QuestDef {
            internal_name: "q".into(),
            start_screen: "s".into(),
            screens: vec![quest_data::ScreenDef {
                internal_name: Some("s".into()),
                ..Default::default()
            }],
            recipes: [("bad".to_string(), quest_data::RecipeDef::Shorthand("no equals".into()))].into(),
            ..QuestDef::default()
        };
        let (graph, report) = build_graph(&def);
        assert!(graph.recipe("bad").is_none());
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            LoadWarning::Document(ValidationError::MalformedRecipe { recipe, .. }) if recipe == "bad"
        )));
    }
}
