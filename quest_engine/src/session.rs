//! A single player's live traversal of a quest graph.
//!
//! [`QuestSession`] owns everything that changes while a quest is played:
//! inventory, variables, the current screen, seen screens and relays,
//! unlocked recipes and the pending choice message. The graph itself is
//! shared and never modified.
//!
//! # Navigation
//! Entering a screen runs its `once` actions on the first visit and its
//! `always` actions on every visit, then makes it current and notifies
//! screen-changed subscribers. Actions may jump or relay again; those nested
//! entries finish before the outer one assigns its own screen, so the
//! outermost entry decides which screen ends up current. Nesting depth is
//! capped by [`EngineConfig::max_hops`] and exceeding it is a
//! [`ActionError::NavigationLoop`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{error, info, warn};
use thiserror::Error;

use crate::action::ActionError;
use crate::config::EngineConfig;
use crate::events::{SubscriptionId, Subscribers};
use crate::expr::{ExprContext, ExprError, Value};
use crate::graph::QuestGraph;
use crate::inventory::Inventory;
use crate::item::{ItemStack, StackLabel};
use crate::screen::{Choice, Screen};
use crate::text;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("start screen '{0}' does not exist")]
    MissingStartScreen(String),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Expr(#[from] ExprError),
}

#[derive(Debug)]
pub struct QuestSession {
    graph: Arc<QuestGraph>,
    config: EngineConfig,
    state: SessionState,
    inventory: Inventory,
    variables: HashMap<String, Value>,
    current_screen: Option<usize>,
    seen_screens: HashSet<usize>,
    seen_relays: HashSet<String>,
    unlocked: Vec<String>,
    choice_message: String,
    depth: usize,
    screen_changed: Subscribers<Screen>,
    choice_selected: Subscribers<Choice>,
    choice_message_changed: Subscribers<str>,
    quest_finished: Subscribers<str>,
}

impl QuestSession {
    pub fn new(graph: Arc<QuestGraph>) -> Self {
        Self::with_config(graph, EngineConfig::default())
    }

    /// Create a session with variables set to the graph's defaults.
    pub fn with_config(graph: Arc<QuestGraph>, config: EngineConfig) -> Self {
        let variables = graph
            .variable_defaults()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            graph,
            config,
            state: SessionState::NotStarted,
            inventory: Inventory::new(),
            variables,
            current_screen: None,
            seen_screens: HashSet::new(),
            seen_relays: HashSet::new(),
            unlocked: Vec::new(),
            choice_message: String::new(),
            depth: 0,
            screen_changed: Subscribers::default(),
            choice_selected: Subscribers::default(),
            choice_message_changed: Subscribers::default(),
            quest_finished: Subscribers::default(),
        }
    }

    /// Enter the start screen and clear the pending message.
    ///
    /// # Errors
    /// - if the graph's start screen does not exist (the session stays not started)
    /// - fatal errors raised by the start screen's actions
    pub fn start(&mut self) -> Result<(), SessionError> {
        let start = self.graph.start_screen().to_string();
        let Some(index) = self.graph.screen_index(&start) else {
            warn!("quest '{}' has no start screen '{start}'", self.graph.internal_name());
            return Err(SessionError::MissingStartScreen(start));
        };
        info!("starting quest '{}' at screen '{start}'", self.graph.internal_name());
        self.state = SessionState::Active;
        if let Err(e) = self.enter_screen(index) {
            if self.current_screen.is_none() {
                self.state = SessionState::NotStarted;
            }
            return Err(e.into());
        }
        self.clear_choice_message();
        Ok(())
    }

    /// Select the `index`-th currently available choice. Out of range does nothing.
    ///
    /// # Errors
    /// Guard evaluation errors and fatal errors from the choice's action.
    pub fn select_choice(&mut self, index: usize) -> Result<(), SessionError> {
        let graph = Arc::clone(&self.graph);
        let Some(screen) = self.current_screen.and_then(|current| graph.screen(current)) else {
            return Ok(());
        };
        let Some(&choice_index) = self.available_choice_indices(screen)?.get(index) else {
            return Ok(());
        };
        let choice = &screen.choices[choice_index];
        info!("choice selected: \"{}\"", choice.title);
        self.clear_choice_message();
        choice.action.execute(self)?;
        self.choice_selected.notify(choice);
        Ok(())
    }

    /// Choices on the current screen whose guards hold right now.
    ///
    /// # Errors
    /// Guard evaluation errors.
    pub fn available_choices(&self) -> Result<Vec<&Choice>, ExprError> {
        let Some(screen) = self.current_screen() else {
            return Ok(Vec::new());
        };
        Ok(self
            .available_choice_indices(screen)?
            .into_iter()
            .map(|index| &screen.choices[index])
            .collect())
    }

    fn available_choice_indices(&self, screen: &Screen) -> Result<Vec<usize>, ExprError> {
        let mut available = Vec::new();
        for (index, choice) in screen.choices.iter().enumerate() {
            if choice.condition.evaluate(self)? {
                available.push(index);
            }
        }
        Ok(available)
    }

    /// Enter the screen at position `index` in the graph.
    pub(crate) fn enter_screen(&mut self, index: usize) -> Result<(), ActionError> {
        self.descend()?;
        let result = self.enter_screen_inner(index);
        self.depth -= 1;
        result
    }

    fn enter_screen_inner(&mut self, index: usize) -> Result<(), ActionError> {
        let graph = Arc::clone(&self.graph);
        let Some(screen) = graph.screen(index) else {
            return Err(ActionError::OutOfRange { offset: index });
        };
        if self.seen_screens.insert(index) {
            screen.actions.once.execute(self)?;
        }
        screen.actions.always.execute(self)?;
        self.current_screen = Some(index);
        info!("screen changed to '{}'", screen.label());
        self.screen_changed.notify(screen);
        Ok(())
    }

    /// Run a relay's stage actions, then the first fork whose guard holds.
    pub(crate) fn use_relay(&mut self, name: &str) -> Result<(), ActionError> {
        self.descend()?;
        let result = self.use_relay_inner(name);
        self.depth -= 1;
        result
    }

    fn use_relay_inner(&mut self, name: &str) -> Result<(), ActionError> {
        let graph = Arc::clone(&self.graph);
        let Some(relay) = graph.relay(name) else {
            return Err(ActionError::UnknownRelay(name.to_string()));
        };
        if self.seen_relays.insert(name.to_string()) {
            relay.actions.once.execute(self)?;
        }
        relay.actions.always.execute(self)?;
        match relay.select_fork(&*self)? {
            Some(fork) => relay.forks[fork].action.execute(self),
            None => {
                info!("relay '{name}': no fork matched");
                Ok(())
            },
        }
    }

    fn descend(&mut self) -> Result<(), ActionError> {
        let limit = self.config.max_hops;
        if self.depth >= limit {
            error!("navigation loop: more than {limit} nested screen/relay entries");
            return Err(ActionError::NavigationLoop { limit });
        }
        self.depth += 1;
        Ok(())
    }

    /// Mark the quest finished and notify subscribers.
    pub fn finish(&mut self) {
        self.state = SessionState::Finished;
        info!("quest '{}' finished", self.graph.internal_name());
        let graph = Arc::clone(&self.graph);
        self.quest_finished.notify(graph.internal_name());
    }

    pub fn set_choice_message(&mut self, message: &str) {
        self.choice_message = message.to_string();
        self.choice_message_changed.notify(message);
    }

    pub fn clear_choice_message(&mut self) {
        self.set_choice_message("");
    }

    pub fn choice_message(&self) -> &str {
        &self.choice_message
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn graph(&self) -> &QuestGraph {
        &self.graph
    }

    pub fn current_screen(&self) -> Option<&Screen> {
        self.current_screen.and_then(|index| self.graph.screen(index))
    }

    pub fn current_screen_index(&self) -> Option<usize> {
        self.current_screen
    }

    /// Text of the current screen, joined and templated. Empty before `start`.
    ///
    /// # Errors
    /// Expression errors inside `[if]` tags.
    pub fn current_screen_text(&self) -> Result<String, ExprError> {
        match self.current_screen() {
            Some(screen) => self.prepare_text(&screen.joined_text()),
            None => Ok(String::new()),
        }
    }

    /// Apply `[if <expr>]...[/if]` templating against this session's state.
    ///
    /// # Errors
    /// Expression errors inside `[if]` tags.
    pub fn prepare_text(&self, text: &str) -> Result<String, ExprError> {
        text::prepare_text(text, self)
    }

    /// Current value of a variable, `Value::Null` if it was never set.
    pub fn variable(&self, name: &str) -> Value {
        self.variables.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Amount held of an item. Unknown items count as zero and are reported.
    pub fn item_count(&self, item: &str) -> u32 {
        if self.graph.item(item).is_none() {
            warn!("counting unknown item '{item}'");
            return 0;
        }
        self.inventory.amount_of(item)
    }

    /// Add a registered item. Returns `false` for unknown items.
    pub fn add_item(&mut self, item: &str, amount: u32) -> bool {
        if !self.is_known_item(item) {
            return false;
        }
        self.inventory.add(item, amount);
        true
    }

    /// Consume a registered item if enough is held. Returns whether anything was consumed.
    pub fn consume_item(&mut self, item: &str, amount: u32) -> bool {
        self.is_known_item(item) && self.inventory.consume(item, amount)
    }

    /// Drop the whole stack of a registered item. Returns whether a stack was removed.
    pub fn remove_item(&mut self, item: &str) -> bool {
        self.is_known_item(item) && self.inventory.remove(item).is_some()
    }

    fn is_known_item(&self, item: &str) -> bool {
        let known = self.graph.item(item).is_some();
        if !known {
            warn!("unknown item '{item}'");
        }
        known
    }

    /// Append a recipe to the unlocked list. Returns `false` for unknown recipes.
    pub fn unlock_recipe(&mut self, recipe: &str) -> bool {
        if self.graph.recipe(recipe).is_none() {
            warn!("unknown recipe '{recipe}'");
            return false;
        }
        self.unlocked.push(recipe.to_string());
        true
    }

    /// Remove the first unlocked entry for a recipe. Returns whether one was removed.
    pub fn lock_recipe(&mut self, recipe: &str) -> bool {
        match self.unlocked.iter().position(|name| name == recipe) {
            Some(index) => {
                self.unlocked.remove(index);
                true
            },
            None => false,
        }
    }

    pub fn is_recipe_unlocked(&self, recipe: &str) -> bool {
        self.unlocked.iter().any(|name| name == recipe)
    }

    /// Unlocked recipe names in unlock order; duplicates are kept.
    pub fn unlocked_recipes(&self) -> &[String] {
        &self.unlocked
    }

    pub(crate) fn unlocked_mut(&mut self) -> &mut Vec<String> {
        &mut self.unlocked
    }

    /// True if the `index`-th unlocked recipe exists and its ingredients are held.
    pub fn can_use_recipe(&self, index: usize) -> bool {
        self.unlocked
            .get(index)
            .and_then(|name| self.graph.recipe(name))
            .is_some_and(|recipe| recipe.can_craft(&self.inventory))
    }

    /// Craft the `index`-th unlocked recipe and announce the results.
    ///
    /// Returns `false` without changing anything when the index is out of
    /// range or the ingredients are missing.
    pub fn use_recipe(&mut self, index: usize) -> bool {
        if !self.can_use_recipe(index) {
            return false;
        }
        let graph = Arc::clone(&self.graph);
        let Some(recipe) = self.unlocked.get(index).and_then(|name| graph.recipe(name)) else {
            return false;
        };
        recipe.craft(&mut self.inventory);
        let message = format!("{} {}", self.config.texts.crafted, self.stack_list(&recipe.results));
        self.set_choice_message(&message);
        true
    }

    /// One line per unlocked recipe: results, ingredients and whether it can be crafted now.
    pub fn available_recipes_as_texts(&self) -> Vec<String> {
        let texts = &self.config.texts;
        self.unlocked
            .iter()
            .filter_map(|name| self.graph.recipe(name))
            .map(|recipe| {
                let status = if recipe.can_craft(&self.inventory) {
                    &texts.craftable
                } else {
                    &texts.missing
                };
                format!(
                    "{} ({}: {}, {status})",
                    self.stack_list(&recipe.results),
                    texts.needs,
                    self.stack_list(&recipe.ingredients)
                )
            })
            .collect()
    }

    /// Numbered inventory listing, or the configured empty text.
    pub fn inventory_as_text(&self) -> String {
        if self.inventory.is_empty() {
            return self.config.texts.empty_inventory.clone();
        }
        self.inventory
            .stacks()
            .iter()
            .enumerate()
            .map(|(index, stack)| {
                format!(
                    "{}. {} ({})",
                    index + 1,
                    self.graph.item_title(&stack.item),
                    stack.amount
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn stack_list(&self, stacks: &[ItemStack]) -> String {
        stacks
            .iter()
            .map(|stack| {
                StackLabel {
                    title: self.graph.item_title(&stack.item),
                    amount: stack.amount,
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn on_screen_changed(&mut self, callback: impl FnMut(&Screen) + 'static) -> SubscriptionId {
        self.screen_changed.subscribe(callback)
    }

    pub fn on_choice_selected(&mut self, callback: impl FnMut(&Choice) + 'static) -> SubscriptionId {
        self.choice_selected.subscribe(callback)
    }

    pub fn on_choice_message_changed(&mut self, callback: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.choice_message_changed.subscribe(callback)
    }

    /// Subscribers receive the quest's internal name.
    pub fn on_quest_finished(&mut self, callback: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.quest_finished.subscribe(callback)
    }

    /// Remove a subscription of any kind. Returns `false` if it was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.screen_changed.unsubscribe(id)
            || self.choice_selected.unsubscribe(id)
            || self.choice_message_changed.unsubscribe(id)
            || self.quest_finished.unsubscribe(id)
    }
}

impl ExprContext for QuestSession {
    fn item_count(&self, item: &str) -> Result<u32, ExprError> {
        Ok(QuestSession::item_count(self, item))
    }

    fn variable(&self, name: &str) -> Result<Value, ExprError> {
        Ok(QuestSession::variable(self, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::Condition;
    use crate::item::Item;
    use crate::recipe::Recipe;
    use crate::screen::StageActions;

    fn commands(list: &[&str]) -> Action {
        Action::new(list.iter().map(|c| (*c).to_string()).collect())
    }

    fn screen(name: &str, once: &[&str], always: &[&str], choices: Vec<Choice>) -> Screen {
        Screen {
            internal_name: Some(name.into()),
            title: name.to_uppercase(),
            text: vec![format!("You are at {name}.")],
            actions: StageActions {
                once: commands(once),
                always: commands(always),
            },
            choices,
        }
    }

    fn choice(title: &str, guard: &[&str], action: &[&str]) -> Choice {
        Choice {
            title: title.into(),
            condition: Condition::new(guard.iter().map(|g| (*g).to_string()).collect()),
            action: commands(action),
        }
    }

    fn session_for(screens: Vec<Screen>) -> QuestSession {
        let mut graph = QuestGraph::new("test", "Test", "start");
        graph.add_item(Item::new("coin", "Coin"));
        graph.add_item(Item::new("gem", "Gem"));
        graph.add_recipe(Recipe {
            internal_name: "polish".into(),
            ingredients: vec![ItemStack::new("coin", 2)],
            results: vec![ItemStack::new("gem", 1)],
        });
        for s in screens {
            graph.add_screen(s);
        }
        QuestSession::new(Arc::new(graph))
    }

    #[test]
    fn start_without_start_screen_fails() {
        let mut session = session_for(vec![screen("elsewhere", &[], &[], vec![])]);
        assert_eq!(session.start(), Err(SessionError::MissingStartScreen("start".into())));
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.current_screen().is_none());
    }

    #[test]
    fn once_runs_once_and_always_every_visit() {
        let mut session = session_for(vec![screen(
            "start",
            &["give coin"],
            &["set visits += 1"],
            vec![choice("Stay", &[], &["jump start"])],
        )]);
        session.set_variable("visits", Value::Number(0.0));
        session.start().unwrap();
        session.select_choice(0).unwrap();
        session.select_choice(0).unwrap();
        assert_eq!(session.item_count("coin"), 1);
        assert_eq!(session.variable("visits"), Value::Number(3.0));
    }

    #[test]
    fn failing_command_does_not_stop_the_rest() {
        let mut session = session_for(vec![screen("start", &["give nothing", "jump nowhere", "give coin 2"], &[], vec![])]);
        session.start().unwrap();
        assert_eq!(session.item_count("coin"), 2);
    }

    #[test]
    fn expression_error_propagates() {
        let mut session = session_for(vec![screen(
            "start",
            &[],
            &[],
            vec![choice("Bad", &[], &["set x = 1 / 0", "give coin"])],
        )]);
        session.start().unwrap();
        assert!(matches!(
            session.select_choice(0),
            Err(SessionError::Action(ActionError::Expr(ExprError::DivisionByZero)))
        ));
        assert_eq!(session.item_count("coin"), 0);
    }

    #[test]
    fn looping_start_screen_leaves_session_not_started() {
        let mut session = session_for(vec![screen("start", &[], &["jump start"], vec![])]);
        assert!(matches!(
            session.start(),
            Err(SessionError::Action(ActionError::NavigationLoop { .. }))
        ));
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.current_screen().is_none());
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let mut session = session_for(vec![screen("start", &[], &[], vec![choice("Locked", &["false"], &["give coin"])])]);
        session.start().unwrap();
        session.select_choice(0).unwrap();
        session.select_choice(7).unwrap();
        assert_eq!(session.item_count("coin"), 0);
    }

    #[test]
    fn recipes_craft_only_when_possible() {
        let mut session = session_for(vec![screen("start", &["unlock polish", "give coin"], &[], vec![])]);
        session.start().unwrap();
        assert_eq!(session.unlocked_recipes(), ["polish"]);
        assert!(!session.can_use_recipe(0));
        assert!(!session.use_recipe(0));
        assert!(!session.use_recipe(3));
        assert_eq!(session.item_count("coin"), 1);
        assert_eq!(session.unlocked_recipes(), ["polish"]);
        assert_eq!(
            session.available_recipes_as_texts(),
            vec!["Gem (needs: Coin x2, missing ingredients)"]
        );

        session.add_item("coin", 1);
        assert!(session.use_recipe(0));
        assert_eq!(session.item_count("coin"), 0);
        assert_eq!(session.item_count("gem"), 1);
        assert_eq!(session.choice_message(), "You crafted Gem");
        assert_eq!(session.inventory_as_text(), "1. Gem (1)");
    }

    #[test]
    fn unlock_keeps_duplicates_and_lock_removes_one() {
        let mut session = session_for(vec![screen("start", &[], &[], vec![])]);
        assert!(session.unlock_recipe("polish"));
        assert!(session.unlock_recipe("polish"));
        assert!(!session.unlock_recipe("nope"));
        assert!(session.lock_recipe("polish"));
        assert!(session.is_recipe_unlocked("polish"));
        assert!(session.lock_recipe("polish"));
        assert!(!session.lock_recipe("polish"));
        assert!(session.unlocked_recipes().is_empty());
    }

    #[test]
    fn inventory_text_when_empty() {
        let session = session_for(vec![]);
        assert_eq!(session.inventory_as_text(), "Empty");
    }
}
