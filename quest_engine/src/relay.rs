//! Relays: invisible routing nodes that pick the first fork whose guard holds.

use crate::action::Action;
use crate::condition::Condition;
use crate::expr::{ExprContext, ExprError};
use crate::screen::StageActions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub internal_name: String,
    pub actions: StageActions,
    pub forks: Vec<Fork>,
}

impl Relay {
    /// Index of the first fork whose guard holds. Later forks are not evaluated.
    ///
    /// # Errors
    /// Guard evaluation errors.
    pub fn select_fork(&self, ctx: &dyn ExprContext) -> Result<Option<usize>, ExprError> {
        for (index, fork) in self.forks.iter().enumerate() {
            if fork.condition.evaluate(ctx)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl From<&quest_data::RelayDef> for Relay {
    fn from(def: &quest_data::RelayDef) -> Self {
        Self {
            internal_name: def.internal_name.clone(),
            actions: StageActions::from(&def.actions),
            forks: def.forks.iter().map(Fork::from).collect(),
        }
    }
}

/// A guarded branch of a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub condition: Condition,
    pub action: Action,
}

impl From<&quest_data::ForkDef> for Fork {
    fn from(def: &quest_data::ForkDef) -> Self {
        Self {
            condition: Condition::from(&def.condition),
            action: Action::from(&def.action),
        }
    }
}
