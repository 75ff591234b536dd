use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identifier used for cross-references inside a quest document.
pub type Id = String;

/// Top-level quest document loaded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestDef {
    pub internal_name: Id,
    #[serde(default)]
    pub title: String,
    pub start_screen: Id,
    #[serde(default)]
    pub items: BTreeMap<Id, ItemDef>,
    #[serde(default)]
    pub recipes: BTreeMap<Id, RecipeDef>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableValue>,
    #[serde(default)]
    pub screens: Vec<ScreenDef>,
    #[serde(default)]
    pub relays: Vec<RelayDef>,
}

/// A single string or a list of strings.
///
/// Used for command lists, guard expressions and screen text, all of which
/// may be written either way in a quest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            OneOrMany::One(single) => std::slice::from_ref(single),
            OneOrMany::Many(many) => many.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.to_string())
    }
}

impl From<Vec<&str>> for OneOrMany {
    fn from(value: Vec<&str>) -> Self {
        OneOrMany::Many(value.into_iter().map(str::to_string).collect())
    }
}

/// Item entry: either just a title or an object carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemDef {
    Title(String),
    Detailed { title: String },
}

impl ItemDef {
    pub fn title(&self) -> &str {
        match self {
            ItemDef::Title(title) | ItemDef::Detailed { title } => title,
        }
    }
}

/// Recipe entry in shorthand (`"stick + stone = sword"`) or explicit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeDef {
    Shorthand(String),
    Detailed {
        ingredients: BTreeMap<Id, u32>,
        #[serde(default)]
        results: BTreeMap<Id, u32>,
    },
}

/// Ingredient and result amounts of a recipe, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeParts {
    pub ingredients: Vec<(Id, u32)>,
    pub results: Vec<(Id, u32)>,
}

impl RecipeDef {
    /// Expand this recipe into ingredient and result amounts.
    ///
    /// In shorthand, every repetition of an item name adds one to its amount.
    ///
    /// ```
    /// use quest_data::RecipeDef;
    ///
    /// let parts = RecipeDef::Shorthand("stick + stone + stone = sword".into()).parts().unwrap();
    /// assert_eq!(parts.ingredients, vec![("stick".to_string(), 1), ("stone".to_string(), 2)]);
    /// assert_eq!(parts.results, vec![("sword".to_string(), 1)]);
    /// ```
    ///
    /// # Errors
    /// Returns a short reason when the shorthand has no single `=` or no results.
    pub fn parts(&self) -> Result<RecipeParts, String> {
        match self {
            RecipeDef::Shorthand(text) => {
                let (lhs, rhs) = text
                    .trim()
                    .split_once('=')
                    .ok_or_else(|| format!("missing '=' in recipe shorthand \"{text}\""))?;
                if rhs.contains('=') {
                    return Err(format!("more than one '=' in recipe shorthand \"{text}\""));
                }
                let results = tally(rhs);
                if results.is_empty() {
                    return Err(format!("recipe shorthand \"{text}\" produces nothing"));
                }
                Ok(RecipeParts {
                    ingredients: tally(lhs),
                    results,
                })
            },
            RecipeDef::Detailed { ingredients, results } => Ok(RecipeParts {
                ingredients: ingredients.iter().map(|(id, n)| (id.clone(), *n)).collect(),
                results: results.iter().map(|(id, n)| (id.clone(), *n)).collect(),
            }),
        }
    }
}

fn tally(side: &str) -> Vec<(Id, u32)> {
    let mut amounts: Vec<(Id, u32)> = Vec::new();
    for name in side.split('+').map(str::trim).filter(|name| !name.is_empty()) {
        match amounts.iter_mut().find(|(id, _)| id == name) {
            Some((_, amount)) => *amount += 1,
            None => amounts.push((name.to_string(), 1)),
        }
    }
    amounts
}

/// Initial value of a quest variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// `once` / `always` command lists attached to a screen or relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionsDef {
    #[serde(default)]
    pub once: OneOrMany,
    #[serde(default)]
    pub always: OneOrMany,
}

/// A displayable narrative node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDef {
    #[serde(default)]
    pub internal_name: Option<Id>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: OneOrMany,
    #[serde(default)]
    pub actions: ActionsDef,
    #[serde(default)]
    pub choices: Vec<ChoiceDef>,
}

/// A player-selectable option on a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDef {
    pub title: String,
    #[serde(default)]
    pub condition: OneOrMany,
    pub action: OneOrMany,
}

/// An invisible routing node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayDef {
    pub internal_name: Id,
    #[serde(default)]
    pub actions: ActionsDef,
    #[serde(default)]
    pub forks: Vec<ForkDef>,
}

/// A guarded branch inside a relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkDef {
    #[serde(default)]
    pub condition: OneOrMany,
    pub action: OneOrMany,
}
