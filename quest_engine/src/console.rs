//! Console host: plays one quest session on the terminal.
//!
//! This is a thin consumer of the public session API, meant for quest authors
//! trying out their documents.

use std::cell::Cell;
use std::io::{self, BufRead, IsTerminal, Write};
use std::rc::Rc;

use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use textwrap::{fill, termwidth};
use variantly::Variantly;

use crate::session::QuestSession;

/// What the player typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum ConsoleInput {
    /// 1-based choice number as shown on screen.
    Choose(usize),
    Inventory,
    Recipes,
    /// 1-based recipe number as shown by `recipes`.
    Craft(usize),
    Help,
    Quit,
    Unknown,
}

/// Interpret one line of player input.
pub fn parse_input(line: &str) -> ConsoleInput {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["inventory" | "inv" | "i"] => ConsoleInput::Inventory,
        ["recipes" | "r"] => ConsoleInput::Recipes,
        ["craft" | "c", number] => number.parse().map_or(ConsoleInput::Unknown, ConsoleInput::Craft),
        ["help" | "?"] => ConsoleInput::Help,
        ["quit" | "exit" | "q"] => ConsoleInput::Quit,
        [number] => number.parse().map_or(ConsoleInput::Unknown, ConsoleInput::Choose),
        _ => ConsoleInput::Unknown,
    }
}

enum Prompt {
    Editor(DefaultEditor),
    Plain,
}

impl Prompt {
    fn new() -> Self {
        if !io::stdin().is_terminal() {
            info!("stdin is not a TTY; using basic input mode");
            return Prompt::Plain;
        }
        match DefaultEditor::new() {
            Ok(editor) => Prompt::Editor(editor),
            Err(err) => {
                warn!("failed to initialize rustyline ({err}), falling back to basic stdin");
                Prompt::Plain
            },
        }
    }

    /// Next input line, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self {
            Prompt::Editor(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty()
                        && let Err(err) = editor.add_history_entry(line.as_str())
                    {
                        warn!("failed to append to history: {err}");
                    }
                    Ok(Some(line))
                },
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
                Err(err) => Err(err).context("reading player input"),
            },
            Prompt::Plain => {
                print!("{prompt}");
                io::stdout().flush()?;
                let mut line = String::new();
                let bytes = io::stdin().lock().read_line(&mut line)?;
                Ok((bytes > 0).then(|| line.trim_end().to_string()))
            },
        }
    }
}

/// Play `session` until the quest finishes or the player quits.
///
/// # Errors
/// Input errors and a failing `start`. Errors raised by a choice are shown to
/// the player and play continues.
pub fn run_console(session: &mut QuestSession) -> Result<()> {
    let finished = Rc::new(Cell::new(false));
    let flag = Rc::clone(&finished);
    let subscription = session.on_quest_finished(move |_| flag.set(true));

    session.start().context("while starting the quest")?;
    let mut prompt = Prompt::new();
    let width = termwidth().min(100);

    while !finished.get() {
        render_screen(session, width);
        let Some(line) = prompt.read_line("> ")? else {
            break;
        };
        match parse_input(&line) {
            ConsoleInput::Choose(number) if number > 0 => {
                if let Err(e) = session.select_choice(number - 1) {
                    println!("{}", format!("error: {e}").red());
                }
            },
            ConsoleInput::Inventory => println!("\n{}", session.inventory_as_text().cyan()),
            ConsoleInput::Recipes => {
                let recipes = session.available_recipes_as_texts();
                if recipes.is_empty() {
                    println!("{}", "No recipes unlocked.".dimmed());
                }
                for (index, text) in recipes.iter().enumerate() {
                    println!("{}. {text}", index + 1);
                }
            },
            ConsoleInput::Craft(number) if number > 0 => {
                if !session.use_recipe(number - 1) {
                    println!("{}", "You can't craft that right now.".yellow());
                }
            },
            ConsoleInput::Help => print_help(),
            ConsoleInput::Quit => break,
            _ => println!("{}", "Type a choice number, or 'help'.".yellow()),
        }
    }

    session.unsubscribe(subscription);
    if finished.get() {
        println!("\n{}", "THE END".bright_yellow().bold());
    }
    Ok(())
}

fn render_screen(session: &QuestSession, width: usize) {
    let Some(screen) = session.current_screen() else {
        return;
    };
    println!("\n{}", screen.title.bright_yellow().underline());
    match session.current_screen_text() {
        Ok(text) if !text.is_empty() => println!("{}", fill(&text, width)),
        Ok(_) => {},
        Err(e) => println!("{}", format!("error in screen text: {e}").red()),
    }
    if !session.choice_message().is_empty() {
        println!("\n{}", fill(session.choice_message(), width).italic());
    }
    match session.available_choices() {
        Ok(choices) => {
            println!();
            for (index, choice) in choices.iter().enumerate() {
                println!("  {} {}", format!("{}.", index + 1).bold(), choice.title);
            }
        },
        Err(e) => println!("{}", format!("error in choice guard: {e}").red()),
    }
}

fn print_help() {
    println!(
        "\n{}\n  <number>   pick a choice\n  inventory  list what you carry\n  recipes    list unlocked recipes\n  craft <n>  craft recipe number n\n  quit       leave the quest",
        "Commands".bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pick_choices() {
        assert_eq!(parse_input(" 2 "), ConsoleInput::Choose(2));
        assert!(parse_input("1").is_choose());
    }

    #[test]
    fn words_map_to_commands() {
        assert_eq!(parse_input("inv"), ConsoleInput::Inventory);
        assert_eq!(parse_input("recipes"), ConsoleInput::Recipes);
        assert_eq!(parse_input("craft 3"), ConsoleInput::Craft(3));
        assert_eq!(parse_input("craft x"), ConsoleInput::Unknown);
        assert_eq!(parse_input("q"), ConsoleInput::Quit);
        assert_eq!(parse_input("dance wildly"), ConsoleInput::Unknown);
        assert_eq!(parse_input(""), ConsoleInput::Unknown);
    }
}
