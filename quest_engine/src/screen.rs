//! Screens and the choices they offer.

use crate::action::Action;
use crate::condition::Condition;

/// Actions run when a screen or relay is entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageActions {
    /// Runs only on the first visit.
    pub once: Action,
    /// Runs on every visit, after `once`.
    pub always: Action,
}

impl From<&quest_data::ActionsDef> for StageActions {
    fn from(def: &quest_data::ActionsDef) -> Self {
        Self {
            once: Action::from(&def.once),
            always: Action::from(&def.always),
        }
    }
}

/// A displayable narrative node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Unnamed screens are reachable only positionally.
    pub internal_name: Option<String>,
    pub title: String,
    pub text: Vec<String>,
    pub actions: StageActions,
    pub choices: Vec<Choice>,
}

impl Screen {
    /// Screen text with lines joined by newlines, before templating.
    pub fn joined_text(&self) -> String {
        self.text.join("\n")
    }

    /// Name used in log lines: the internal name, or the title for unnamed screens.
    pub fn label(&self) -> &str {
        self.internal_name.as_deref().unwrap_or(&self.title)
    }
}

impl From<&quest_data::ScreenDef> for Screen {
    fn from(def: &quest_data::ScreenDef) -> Self {
        Self {
            internal_name: def.internal_name.clone(),
            title: def.title.clone(),
            text: def.text.to_vec(),
            actions: StageActions::from(&def.actions),
            choices: def.choices.iter().map(Choice::from).collect(),
        }
    }
}

/// A guarded, player-selectable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub title: String,
    pub condition: Condition,
    pub action: Action,
}

impl Choice {
    /// True when selecting this choice moves the player elsewhere.
    pub fn changes_screen(&self) -> bool {
        ["jump", "relay", "next"].iter().any(|verb| self.action.has_verb(verb))
    }

    pub fn has_message(&self) -> bool {
        self.action.has_verb("message")
    }
}

impl From<&quest_data::ChoiceDef> for Choice {
    fn from(def: &quest_data::ChoiceDef) -> Self {
        Self {
            title: def.title.clone(),
            condition: Condition::from(&def.condition),
            action: Action::from(&def.action),
        }
    }
}
