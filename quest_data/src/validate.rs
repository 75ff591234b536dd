use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Problem found in a quest document: a duplicate key, a dangling reference or a bad value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    MalformedRecipe { recipe: String, reason: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::MalformedRecipe { recipe, reason } => {
                write!(f, "malformed recipe '{recipe}': {reason}")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check cross-references and basic invariants in a `QuestDef`.
///
/// Nothing found here is fatal to the engine; callers decide whether to
/// report or refuse.
///
/// ```
/// use quest_data::{QuestDef, ScreenDef, validate_quest};
///
/// let quest = QuestDef {
///     internal_name: "demo".into(),
///     title: "Demo".into(),
///     start_screen: "start".into(),
///     screens: vec![ScreenDef {
///         internal_name: Some("start".into()),
///         title: "Start".into(),
///         ..ScreenDef::default()
///     }],
///     ..QuestDef::default()
/// };
/// assert!(validate_quest(&quest).is_empty());
/// ```
pub fn validate_quest(quest: &QuestDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut screens = HashSet::new();
    let mut relays = HashSet::new();
    let items: HashSet<String> = quest.items.keys().cloned().collect();

    track_ids(
        "screen",
        quest.screens.iter().filter_map(|s| s.internal_name.as_deref()),
        &mut screens,
        &mut errors,
    );
    track_ids(
        "relay",
        quest.relays.iter().map(|r| r.internal_name.as_str()),
        &mut relays,
        &mut errors,
    );

    if quest.internal_name.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "quest internalName missing".to_string(),
        });
    }

    if quest.start_screen.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "quest startScreen missing".to_string(),
        });
    } else {
        check_ref(
            "screen",
            &quest.start_screen,
            &screens,
            "quest startScreen".to_string(),
            &mut errors,
        );
    }

    for (index, relay) in quest.relays.iter().enumerate() {
        if relay.internal_name.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("relay #{index} has no internalName"),
            });
        }
    }

    for (name, recipe) in &quest.recipes {
        match recipe.parts() {
            Ok(parts) => {
                for (item, _) in parts.ingredients.iter().chain(parts.results.iter()) {
                    check_ref("item", item, &items, format!("recipe '{name}'"), &mut errors);
                }
            },
            Err(reason) => errors.push(ValidationError::MalformedRecipe {
                recipe: name.clone(),
                reason,
            }),
        }
    }

    errors
}

fn track_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    set: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for id in ids {
        if !set.insert(id.to_string()) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn check_ref(kind: &'static str, id: &str, set: &HashSet<String>, context: String, errors: &mut Vec<ValidationError>) {
    if !set.contains(id) {
        errors.push(ValidationError::MissingReference {
            kind,
            id: id.to_string(),
            context,
        });
    }
}
