//! Action command parsing.
//!
//! A command string such as `give coin 3` or `message "You hear a noise."` is
//! first split into a [`RawCommand`] (verb plus positional string arguments) and
//! then converted into the typed [`Command`] the executor matches on.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use variantly::Variantly;

use crate::expr::BinaryOp;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r#"[^\s"]+|"([^"]*)""#).expect("token pattern is valid");
}

/// A tokenized command before verb-specific conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    pub verb: String,
    pub args: Vec<String>,
}

/// Split a command string into its verb and arguments.
///
/// Whitespace separates tokens except inside double quotes, which are stripped.
/// Returns `None` for a blank command.
pub fn tokenize(source: &str) -> Option<RawCommand> {
    let mut tokens = TOKEN.captures_iter(source).map(|caps| match caps.get(1) {
        Some(quoted) => quoted.as_str().to_string(),
        None => caps[0].to_string(),
    });
    let verb = tokens.next()?;
    Some(RawCommand {
        verb,
        args: tokens.collect(),
    })
}

/// Operators accepted by the `set` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(AssignOp::Assign),
            "+=" => Some(AssignOp::Add),
            "-=" => Some(AssignOp::Sub),
            "*=" => Some(AssignOp::Mul),
            "/=" => Some(AssignOp::Div),
            _ => None,
        }
    }

    /// Binary operator used to combine the old value with the new one; `None` for plain assignment.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// Commands an action script may contain.
#[derive(Debug, Clone, PartialEq, Variantly)]
pub enum Command {
    Jump(String),
    Relay(String),
    Message(String),
    Give { item: String, amount: u32 },
    Consume { item: String, amount: u32 },
    Unlock(String),
    Lock(String),
    Set {
        variable: String,
        operator: AssignOp,
        expression: String,
    },
    Exit,
    Next(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),
    #[error("'{verb}' is missing its {argument} argument")]
    MissingArgument { verb: String, argument: &'static str },
    #[error("'{verb}' got a bad {argument}: '{value}'")]
    BadArgument {
        verb: String,
        argument: &'static str,
        value: String,
    },
}

/// Verbs recognized by [`Command::try_from`].
pub const VERBS: &[&str] = &[
    "jump", "relay", "message", "give", "consume", "unlock", "lock", "set", "exit", "next",
];

impl TryFrom<RawCommand> for Command {
    type Error = CommandError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let RawCommand { verb, args } = raw;
        let required = |index: usize, argument: &'static str| {
            args.get(index).cloned().ok_or_else(|| CommandError::MissingArgument {
                verb: verb.clone(),
                argument,
            })
        };
        let amount = |index: usize| match args.get(index) {
            None => Ok(1),
            Some(value) => value.parse::<u32>().map_err(|_| CommandError::BadArgument {
                verb: verb.clone(),
                argument: "amount",
                value: value.clone(),
            }),
        };

        let command = match verb.as_str() {
            "jump" => Command::Jump(required(0, "screen")?),
            "relay" => Command::Relay(required(0, "relay")?),
            "message" => {
                required(0, "text")?;
                Command::Message(args.join(" "))
            },
            "give" => Command::Give {
                item: required(0, "item")?,
                amount: amount(1)?,
            },
            "consume" => Command::Consume {
                item: required(0, "item")?,
                amount: amount(1)?,
            },
            "unlock" => Command::Unlock(required(0, "recipe")?),
            "lock" => Command::Lock(required(0, "recipe")?),
            "set" => {
                let variable = required(0, "variable")?;
                let symbol = required(1, "operator")?;
                let operator = AssignOp::from_symbol(&symbol).ok_or_else(|| CommandError::BadArgument {
                    verb: verb.clone(),
                    argument: "operator",
                    value: symbol.clone(),
                })?;
                required(2, "expression")?;
                Command::Set {
                    variable,
                    operator,
                    expression: args[2..].join(" "),
                }
            },
            "exit" => Command::Exit,
            "next" => Command::Next(amount(0)? as usize),
            _ => return Err(CommandError::UnknownVerb(verb.clone())),
        };
        Ok(command)
    }
}

/// Tokenize and convert a single command string.
///
/// # Errors
/// Any [`CommandError`], including [`CommandError::Empty`] for a blank string.
pub fn parse_command(source: &str) -> Result<Command, CommandError> {
    tokenize(source).ok_or(CommandError::Empty)?.try_into()
}
