//! The immutable, loaded representation of a quest.
//!
//! A [`QuestGraph`] is filled once through its `add_*` methods (normally by
//! [`crate::loader::build_graph`]) and then shared read-only between sessions.
//! Re-registering a key replaces the earlier entry and logs a warning.

use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::expr::Value;
use crate::item::Item;
use crate::recipe::Recipe;
use crate::relay::Relay;
use crate::screen::Screen;

#[derive(Debug, Clone, Default)]
pub struct QuestGraph {
    internal_name: String,
    title: String,
    start_screen: String,
    items: HashMap<String, Item>,
    recipes: HashMap<String, Recipe>,
    variables: BTreeMap<String, Value>,
    /// Every screen in declared order, named or not.
    screens: Vec<Screen>,
    screen_names: HashMap<String, usize>,
    relays: HashMap<String, Relay>,
}

impl QuestGraph {
    pub fn new(internal_name: impl Into<String>, title: impl Into<String>, start_screen: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            title: title.into(),
            start_screen: start_screen.into(),
            ..Self::default()
        }
    }

    /// Register an item. Returns `true` if it replaced an earlier one.
    pub fn add_item(&mut self, item: Item) -> bool {
        let replaced = self.items.insert(item.internal_name.clone(), item);
        if let Some(old) = &replaced {
            warn!("item '{}' registered twice; keeping the later one", old.internal_name);
        }
        replaced.is_some()
    }

    /// Register a recipe. Returns `true` if it replaced an earlier one.
    pub fn add_recipe(&mut self, recipe: Recipe) -> bool {
        let replaced = self.recipes.insert(recipe.internal_name.clone(), recipe);
        if let Some(old) = &replaced {
            warn!("recipe '{}' registered twice; keeping the later one", old.internal_name);
        }
        replaced.is_some()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Append a screen. A repeated internal name now resolves to this screen,
    /// while the earlier one stays reachable by position. Returns `true` on a repeat.
    pub fn add_screen(&mut self, screen: Screen) -> bool {
        let index = self.screens.len();
        let replaced = screen
            .internal_name
            .clone()
            .and_then(|name| self.screen_names.insert(name, index))
            .is_some();
        if replaced {
            warn!("screen '{}' registered twice; keeping the later one", screen.label());
        }
        self.screens.push(screen);
        replaced
    }

    /// Register a relay. Returns `true` if it replaced an earlier one.
    pub fn add_relay(&mut self, relay: Relay) -> bool {
        let replaced = self.relays.insert(relay.internal_name.clone(), relay);
        if let Some(old) = &replaced {
            warn!("relay '{}' registered twice; keeping the later one", old.internal_name);
        }
        replaced.is_some()
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_screen(&self) -> &str {
        &self.start_screen
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn items(&self) -> &HashMap<String, Item> {
        &self.items
    }

    /// Display title of an item, or its internal name if it is not registered.
    pub fn item_title<'a>(&'a self, name: &'a str) -> &'a str {
        self.items.get(name).map_or(name, |item| item.title.as_str())
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn recipes(&self) -> &HashMap<String, Recipe> {
        &self.recipes
    }

    pub fn variable_defaults(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn screen_index(&self, name: &str) -> Option<usize> {
        self.screen_names.get(name).copied()
    }

    pub fn screen(&self, index: usize) -> Option<&Screen> {
        self.screens.get(index)
    }

    pub fn screen_by_name(&self, name: &str) -> Option<&Screen> {
        self.screen_index(name).and_then(|index| self.screen(index))
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Internal names of the named screens, in no particular order.
    pub fn screen_names(&self) -> impl Iterator<Item = &str> {
        self.screen_names.keys().map(String::as_str)
    }

    pub fn relay(&self, name: &str) -> Option<&Relay> {
        self.relays.get(name)
    }

    pub fn relays(&self) -> &HashMap<String, Relay> {
        &self.relays
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::StageActions;

    fn screen(name: Option<&str>, title: &str) -> Screen {
        Screen {
            internal_name: name.map(str::to_string),
            title: title.into(),
            text: Vec::new(),
            actions: StageActions::default(),
            choices: Vec::new(),
        }
    }

    #[test]
    fn duplicate_screen_name_keeps_the_later_one() {
        let mut graph = QuestGraph::new("q", "Q", "start");
        assert!(!graph.add_screen(screen(Some("start"), "First")));
        assert!(!graph.add_screen(screen(None, "Between")));
        assert!(graph.add_screen(screen(Some("start"), "Second")));
        assert_eq!(graph.screen_by_name("start").unwrap().title, "Second");
        assert_eq!(graph.screens().len(), 3);
        assert_eq!(graph.screen(0).unwrap().title, "First");
    }

    #[test]
    fn duplicate_item_keeps_the_later_title() {
        let mut graph = QuestGraph::new("q", "Q", "start");
        graph.add_item(Item::new("coin", "Coin"));
        assert!(graph.add_item(Item::new("coin", "Gold coin")));
        assert_eq!(graph.item_title("coin"), "Gold coin");
        assert_eq!(graph.item_title("gem"), "gem");
    }
}
