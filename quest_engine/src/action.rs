//! Action scripts and the command executor.
//!
//! An [`Action`] is an ordered list of command strings. Executing it parses each
//! command and hands it to [`dispatch_action`], which calls one function per
//! verb. Commands run in declared order and a failing command does not stop
//! the ones after it, with two exceptions: expression errors and the
//! navigation-loop guard abort the rest of the script and propagate.
//!
//! Every executed command logs a line of the form
//! ```text
//! └─ action: Verb(args)
//! ```

use log::{info, warn};
use thiserror::Error;

use crate::command::{AssignOp, Command, CommandError, parse_command, tokenize};
use crate::expr::{self, ExprError, Standalone, Value};
use crate::session::QuestSession;

/// Ordered list of raw command strings, parsed on every execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    commands: Vec<String>,
}

impl Action {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// True if any command in the script starts with `verb`.
    pub fn has_verb(&self, verb: &str) -> bool {
        self.commands
            .iter()
            .filter_map(|command| tokenize(command))
            .any(|raw| raw.verb == verb)
    }

    /// Run every command against `session`.
    ///
    /// # Errors
    /// Only fatal errors (see [`ActionError::is_fatal`]) are returned; everything
    /// else is logged and skipped.
    pub fn execute(&self, session: &mut QuestSession) -> Result<(), ActionError> {
        for source in &self.commands {
            let result = parse_command(source)
                .map_err(ActionError::from)
                .and_then(|command| dispatch_action(session, &command));
            match result {
                Ok(()) => {},
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("skipping command \"{source}\": {e}"),
            }
        }
        Ok(())
    }
}

impl From<&quest_data::OneOrMany> for Action {
    fn from(value: &quest_data::OneOrMany) -> Self {
        Self::new(value.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("unknown screen '{0}'")]
    UnknownScreen(String),
    #[error("unknown relay '{0}'")]
    UnknownRelay(String),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("unknown recipe '{0}'")]
    UnknownRecipe(String),
    #[error("no screen {offset} position(s) after the current one")]
    OutOfRange { offset: usize },
    #[error("there is no current screen to move from")]
    NoCurrentScreen,
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("navigation exceeded {limit} nested jumps/relays (loop?)")]
    NavigationLoop { limit: usize },
}

impl ActionError {
    /// Fatal errors abort the running script and propagate to the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::Expr(_) | ActionError::NavigationLoop { .. })
    }
}

/// Execute one parsed command.
///
/// # Errors
/// Unknown references, bad targets, expression errors and the navigation loop.
pub fn dispatch_action(session: &mut QuestSession, command: &Command) -> Result<(), ActionError> {
    match command {
        Command::Jump(screen) => jump(session, screen),
        Command::Relay(relay) => relay_to(session, relay),
        Command::Message(text) => message(session, text),
        Command::Give { item, amount } => give(session, item, *amount),
        Command::Consume { item, amount } => consume(session, item, *amount),
        Command::Unlock(recipe) => unlock(session, recipe),
        Command::Lock(recipe) => lock(session, recipe),
        Command::Set {
            variable,
            operator,
            expression,
        } => set_variable(session, variable, *operator, expression),
        Command::Exit => exit(session),
        Command::Next(amount) => next_screen(session, *amount),
    }
}

/// Enter the named screen.
///
/// # Errors
/// - if the screen name is unknown
/// - anything raised while entering the screen
pub fn jump(session: &mut QuestSession, screen: &str) -> Result<(), ActionError> {
    let index = session
        .graph()
        .screen_index(screen)
        .ok_or_else(|| ActionError::UnknownScreen(screen.to_string()))?;
    info!("└─ action: Jump({screen})");
    session.enter_screen(index)
}

/// Enter the screen `amount` positions after the current one, named or not.
///
/// # Errors
/// - if there is no current screen or the target is past the last screen
/// - anything raised while entering the screen
pub fn next_screen(session: &mut QuestSession, amount: usize) -> Result<(), ActionError> {
    let current = session.current_screen_index().ok_or(ActionError::NoCurrentScreen)?;
    let target = current + amount;
    if target >= session.graph().screens().len() {
        return Err(ActionError::OutOfRange { offset: amount });
    }
    info!("└─ action: Next({amount}) -> screen #{target}");
    session.enter_screen(target)
}

/// Dispatch through the named relay.
///
/// # Errors
/// - if the relay name is unknown
/// - anything raised by the relay's actions or guards
pub fn relay_to(session: &mut QuestSession, relay: &str) -> Result<(), ActionError> {
    if session.graph().relay(relay).is_none() {
        return Err(ActionError::UnknownRelay(relay.to_string()));
    }
    info!("└─ action: Relay({relay})");
    session.use_relay(relay)
}

/// Set the pending choice message.
///
/// # Errors
/// Never fails; returns `Result` for dispatch uniformity.
#[allow(clippy::unnecessary_wraps)]
pub fn message(session: &mut QuestSession, text: &str) -> Result<(), ActionError> {
    info!("└─ action: Message(\"{text}\")");
    session.set_choice_message(text);
    Ok(())
}

/// Add items to the inventory.
///
/// # Errors
/// - if the item is not registered in the graph
pub fn give(session: &mut QuestSession, item: &str, amount: u32) -> Result<(), ActionError> {
    if session.graph().item(item).is_none() {
        return Err(ActionError::UnknownItem(item.to_string()));
    }
    session.inventory_mut().add(item, amount);
    info!("└─ action: Give({item}, {amount})");
    Ok(())
}

/// Remove items from the inventory if enough are held; otherwise nothing changes.
///
/// # Errors
/// - if the item is not registered in the graph
pub fn consume(session: &mut QuestSession, item: &str, amount: u32) -> Result<(), ActionError> {
    if session.graph().item(item).is_none() {
        return Err(ActionError::UnknownItem(item.to_string()));
    }
    if session.inventory_mut().consume(item, amount) {
        info!("└─ action: Consume({item}, {amount})");
    } else {
        info!("└─ action: Consume({item}, {amount}) skipped, not enough held");
    }
    Ok(())
}

/// Append a recipe to the unlocked list. Repeated unlocks add repeated entries.
///
/// # Errors
/// - if the recipe is unknown
pub fn unlock(session: &mut QuestSession, recipe: &str) -> Result<(), ActionError> {
    if session.graph().recipe(recipe).is_none() {
        return Err(ActionError::UnknownRecipe(recipe.to_string()));
    }
    session.unlocked_mut().push(recipe.to_string());
    info!("└─ action: Unlock({recipe})");
    Ok(())
}

/// Remove the first unlocked entry for a recipe, if any.
///
/// # Errors
/// - if the recipe is unknown
pub fn lock(session: &mut QuestSession, recipe: &str) -> Result<(), ActionError> {
    if session.graph().recipe(recipe).is_none() {
        return Err(ActionError::UnknownRecipe(recipe.to_string()));
    }
    let unlocked = session.unlocked_mut();
    if let Some(index) = unlocked.iter().position(|name| name == recipe) {
        unlocked.remove(index);
    }
    info!("└─ action: Lock({recipe})");
    Ok(())
}

/// Combine a variable with an expression and store the result.
///
/// The expression is evaluated on its own: `item()` and `var()` are not available.
///
/// # Errors
/// - any expression error, which is fatal to the running script
pub fn set_variable(
    session: &mut QuestSession,
    variable: &str,
    operator: AssignOp,
    expression: &str,
) -> Result<(), ActionError> {
    let rhs = expr::evaluate(expression, &Standalone)?;
    let value: Value = match operator.binary() {
        None => rhs,
        Some(op) => expr::apply_binary(op, session.variable(variable), rhs)?,
    };
    info!("└─ action: Set({variable} {} {expression}) -> {value}", operator.symbol());
    session.set_variable(variable, value);
    Ok(())
}

/// Finish the quest.
///
/// # Errors
/// Never fails; returns `Result` for dispatch uniformity.
#[allow(clippy::unnecessary_wraps)]
pub fn exit(session: &mut QuestSession) -> Result<(), ActionError> {
    info!("└─ action: Exit");
    session.finish();
    Ok(())
}
