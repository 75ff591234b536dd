//! Static checks over a built graph's scripts and guards.
//!
//! Catches unknown verbs, bad arguments, dangling jump/relay/item/recipe
//! targets, unparsable expressions and guards reading variables nothing ever
//! defines, before a player runs into them.

use std::collections::BTreeSet;

use crate::action::Action;
use crate::command::{Command, parse_command};
use crate::condition::Condition;
use crate::expr;
use crate::graph::QuestGraph;
use crate::loader::LoadWarning;

/// Check every action and guard in `graph`.
pub fn lint_graph(graph: &QuestGraph) -> Vec<LoadWarning> {
    let mut warnings = Vec::new();
    let known = known_variables(graph);

    for (index, screen) in graph.screens().iter().enumerate() {
        let place = format!("screen #{index} '{}'", screen.label());
        lint_action(graph, &screen.actions.once, &format!("{place} once"), &mut warnings);
        lint_action(graph, &screen.actions.always, &format!("{place} always"), &mut warnings);
        for (choice_index, choice) in screen.choices.iter().enumerate() {
            let context = format!("{place} choice #{choice_index} '{}'", choice.title);
            lint_condition(&choice.condition, &known, &context, &mut warnings);
            lint_action(graph, &choice.action, &context, &mut warnings);
        }
    }

    let mut relays: Vec<_> = graph.relays().values().collect();
    relays.sort_by(|a, b| a.internal_name.cmp(&b.internal_name));
    for relay in relays {
        let place = format!("relay '{}'", relay.internal_name);
        lint_action(graph, &relay.actions.once, &format!("{place} once"), &mut warnings);
        lint_action(graph, &relay.actions.always, &format!("{place} always"), &mut warnings);
        for (fork_index, fork) in relay.forks.iter().enumerate() {
            let context = format!("{place} fork #{fork_index}");
            lint_condition(&fork.condition, &known, &context, &mut warnings);
            lint_action(graph, &fork.action, &context, &mut warnings);
        }
    }

    warnings
}

/// Variables with a default plus every `set` target in the graph.
fn known_variables(graph: &QuestGraph) -> BTreeSet<String> {
    let mut known: BTreeSet<String> = graph.variable_defaults().keys().cloned().collect();
    let screen_actions = graph.screens().iter().flat_map(|screen| {
        [&screen.actions.once, &screen.actions.always]
            .into_iter()
            .chain(screen.choices.iter().map(|choice| &choice.action))
    });
    let relay_actions = graph.relays().values().flat_map(|relay| {
        [&relay.actions.once, &relay.actions.always]
            .into_iter()
            .chain(relay.forks.iter().map(|fork| &fork.action))
    });
    for action in screen_actions.chain(relay_actions) {
        for source in action.commands() {
            if let Ok(Command::Set { variable, .. }) = parse_command(source) {
                known.insert(variable);
            }
        }
    }
    known
}

fn lint_condition(condition: &Condition, known: &BTreeSet<String>, context: &str, warnings: &mut Vec<LoadWarning>) {
    for source in condition.expressions() {
        match expr::parse(source) {
            Ok(expression) => {
                for name in expression.variables() {
                    if !known.contains(name) {
                        push(
                            warnings,
                            context,
                            format!("\"{source}\" reads variable '{name}', which has no default and is never set"),
                        );
                    }
                }
            },
            Err(e) => push(warnings, context, e.to_string()),
        }
    }
}

fn lint_action(graph: &QuestGraph, action: &Action, context: &str, warnings: &mut Vec<LoadWarning>) {
    for source in action.commands() {
        let command = match parse_command(source) {
            Ok(command) => command,
            Err(e) => {
                push(warnings, context, format!("\"{source}\": {e}"));
                continue;
            },
        };
        let missing = match &command {
            Command::Jump(screen) if graph.screen_index(screen).is_none() => Some(("screen", screen)),
            Command::Relay(relay) if graph.relay(relay).is_none() => Some(("relay", relay)),
            Command::Give { item, .. } | Command::Consume { item, .. } if graph.item(item).is_none() => {
                Some(("item", item))
            },
            Command::Unlock(recipe) | Command::Lock(recipe) if graph.recipe(recipe).is_none() => {
                Some(("recipe", recipe))
            },
            Command::Set { expression, .. } => {
                if let Err(e) = expr::parse(expression) {
                    push(warnings, context, format!("\"{source}\": {e}"));
                }
                None
            },
            _ => None,
        };
        if let Some((kind, name)) = missing {
            push(warnings, context, format!("\"{source}\" refers to unknown {kind} '{name}'"));
        }
    }
}

fn push(warnings: &mut Vec<LoadWarning>, context: &str, message: String) {
    warnings.push(LoadWarning::Script {
        context: context.to_string(),
        message,
    });
}
