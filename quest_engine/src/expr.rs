//! Expression language used by guards, inline `[if ...]` tags and the `set` command.
//!
//! The grammar lives in `expr.pest`. Parsed expressions become an [`Expr`] tree
//! which is evaluated against an [`ExprContext`] that answers the two accessor
//! forms, `item(name)` and `var(name)`.
//!
//! # Semantics
//! - values are booleans, numbers (f64), text, or `Null` for an unset variable
//! - `+` adds numbers and concatenates when either side is text
//! - `==`/`===` and `!=`/`!==` are both strict: no coercion between types
//! - `!`, `&&` and `||` work on truthiness (`false`, `0`, NaN, `""`, `Null` are falsy)
//!
//! Anything the grammar or the value rules reject is an [`ExprError`]; callers
//! never get a silent `false` for a malformed guard.

use std::fmt;

use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pairs;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser as PestParser;
use quest_data::VariableValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(PestParser)]
#[grammar = "src/expr.pest"]
struct ExprParser;

lazy_static! {
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::op_or, Assoc::Left))
        .op(Op::infix(Rule::op_and, Assoc::Left))
        .op(Op::infix(Rule::op_eq, Assoc::Left)
            | Op::infix(Rule::op_strict_eq, Assoc::Left)
            | Op::infix(Rule::op_ne, Assoc::Left)
            | Op::infix(Rule::op_strict_ne, Assoc::Left))
        .op(Op::infix(Rule::op_lt, Assoc::Left)
            | Op::infix(Rule::op_le, Assoc::Left)
            | Op::infix(Rule::op_gt, Assoc::Left)
            | Op::infix(Rule::op_ge, Assoc::Left))
        .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
        .op(Op::infix(Rule::op_mul, Assoc::Left) | Op::infix(Rule::op_div, Assoc::Left))
        .op(Op::prefix(Rule::op_not) | Op::prefix(Rule::op_neg));
}

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("cannot parse expression \"{expr}\": {message}")]
    Parse { expr: String, message: String },
    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("cannot apply unary '{op}' to {operand}")]
    UnaryTypeMismatch { op: &'static str, operand: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("'{accessor}({name})' cannot be used in this expression")]
    AccessorNotAllowed { accessor: &'static str, name: String },
}

/// A runtime value: the type of quest variables and of every expression result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&VariableValue> for Value {
    fn from(value: &VariableValue) -> Self {
        match value {
            VariableValue::Bool(b) => Value::Bool(*b),
            VariableValue::Number(n) => Value::Number(*n),
            VariableValue::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::StrictEq => "===",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Item(String),
    Var(String),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

/// Supplies runtime values for the `item()` and `var()` accessors.
pub trait ExprContext {
    /// # Errors
    /// Implementations may refuse the accessor entirely.
    fn item_count(&self, item: &str) -> Result<u32, ExprError>;

    /// # Errors
    /// Implementations may refuse the accessor entirely.
    fn variable(&self, name: &str) -> Result<Value, ExprError>;
}

/// Context for expressions that must stand alone, such as the right-hand side of `set`.
pub struct Standalone;

impl ExprContext for Standalone {
    fn item_count(&self, item: &str) -> Result<u32, ExprError> {
        Err(ExprError::AccessorNotAllowed {
            accessor: "item",
            name: item.to_string(),
        })
    }

    fn variable(&self, name: &str) -> Result<Value, ExprError> {
        Err(ExprError::AccessorNotAllowed {
            accessor: "var",
            name: name.to_string(),
        })
    }
}

/// Parse expression source into an [`Expr`].
///
/// # Errors
/// Returns [`ExprError::Parse`] for anything outside the grammar.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let parse_error = |message: String| ExprError::Parse {
        expr: source.to_string(),
        message,
    };
    let mut pairs = ExprParser::parse(Rule::expression, source).map_err(|e| parse_error(e.to_string()))?;
    let expr = pairs
        .next()
        .and_then(|expression| expression.into_inner().next())
        .ok_or_else(|| parse_error("empty expression".to_string()))?;
    build(expr.into_inner()).map_err(|e| match e {
        ExprError::Parse { message, .. } => parse_error(message),
        other => other,
    })
}

fn build(pairs: Pairs<'_, Rule>) -> Result<Expr, ExprError> {
    let shape = |message: String| ExprError::Parse {
        expr: String::new(),
        message,
    };
    PRATT
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => primary
                .as_str()
                .parse::<f64>()
                .map(|n| Expr::Literal(Value::Number(n)))
                .map_err(|e| shape(e.to_string())),
            Rule::boolean => Ok(Expr::Literal(Value::Bool(primary.as_str() == "true"))),
            Rule::string => {
                let quoted = primary.as_str();
                Ok(Expr::Literal(Value::Text(quoted[1..quoted.len() - 1].to_string())))
            },
            Rule::accessor => {
                let mut inner = primary.into_inner();
                let kind = inner.next().map(|p| p.as_str().to_string());
                let name = inner.next().map(|p| p.as_str().to_string());
                match (kind.as_deref(), name) {
                    (Some("item"), Some(name)) => Ok(Expr::Item(name)),
                    (Some("var"), Some(name)) => Ok(Expr::Var(name)),
                    _ => Err(shape("malformed accessor".to_string())),
                }
            },
            Rule::expr => build(primary.into_inner()),
            rule => Err(shape(format!("unexpected {rule:?}"))),
        })
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::op_not => UnaryOp::Not,
                Rule::op_neg => UnaryOp::Neg,
                rule => return Err(shape(format!("unexpected prefix {rule:?}"))),
            };
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand?),
            })
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::op_or => BinaryOp::Or,
                Rule::op_and => BinaryOp::And,
                Rule::op_eq => BinaryOp::Eq,
                Rule::op_strict_eq => BinaryOp::StrictEq,
                Rule::op_ne => BinaryOp::Ne,
                Rule::op_strict_ne => BinaryOp::StrictNe,
                Rule::op_lt => BinaryOp::Lt,
                Rule::op_le => BinaryOp::Le,
                Rule::op_gt => BinaryOp::Gt,
                Rule::op_ge => BinaryOp::Ge,
                Rule::op_add => BinaryOp::Add,
                Rule::op_sub => BinaryOp::Sub,
                Rule::op_mul => BinaryOp::Mul,
                Rule::op_div => BinaryOp::Div,
                rule => return Err(shape(format!("unexpected operator {rule:?}"))),
            };
            Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            })
        })
        .parse(pairs)
}

impl Expr {
    /// Names read through `var()` anywhere in this expression, in source order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Var(name) => names.push(name),
            Expr::Unary { operand, .. } => operand.collect_variables(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            },
            Expr::Literal(_) | Expr::Item(_) => {},
        }
    }

    /// Evaluate this expression, asking `ctx` for accessor values.
    ///
    /// # Errors
    /// Type errors, division by zero, or an accessor the context refuses.
    pub fn eval(&self, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Item(name) => Ok(Value::Number(f64::from(ctx.item_count(name)?))),
            Expr::Var(name) => ctx.variable(name),
            Expr::Unary { op, operand } => {
                let value = operand.eval(ctx)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Neg, other) => Err(ExprError::UnaryTypeMismatch {
                        op: "-",
                        operand: other.type_name(),
                    }),
                }
            },
            Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
                Ok(Value::Bool(lhs.eval(ctx)?.is_truthy() && rhs.eval(ctx)?.is_truthy()))
            },
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                Ok(Value::Bool(lhs.eval(ctx)?.is_truthy() || rhs.eval(ctx)?.is_truthy()))
            },
            Expr::Binary { op, lhs, rhs } => apply_binary(*op, lhs.eval(ctx)?, rhs.eval(ctx)?),
        }
    }
}

/// Combine two already-evaluated values with a binary operator.
///
/// # Errors
/// Type errors and division by zero.
pub fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    let mismatch = |lhs: &Value, rhs: &Value| ExprError::TypeMismatch {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };
    match op {
        BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
        BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Eq | BinaryOp::StrictEq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne | BinaryOp::StrictNe => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                // mixed or null operands never order, so the comparison is false
                _ => None,
            };
            let result = ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            });
            Ok(Value::Bool(result))
        },
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Text(_), _) | (_, Value::Text(_)) => Ok(Value::Text(format!("{lhs}{rhs}"))),
            _ => Err(mismatch(&lhs, &rhs)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
                return Err(mismatch(&lhs, &rhs));
            };
            match op {
                BinaryOp::Sub => Ok(Value::Number(a - b)),
                BinaryOp::Mul => Ok(Value::Number(a * b)),
                _ if *b == 0.0 => Err(ExprError::DivisionByZero),
                _ => Ok(Value::Number(a / b)),
            }
        },
    }
}

/// Parse and evaluate `source` in one step.
///
/// # Errors
/// Any parse or evaluation error.
pub fn evaluate(source: &str, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
    parse(source)?.eval(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapContext {
        items: HashMap<String, u32>,
        vars: HashMap<String, Value>,
    }

    impl ExprContext for MapContext {
        fn item_count(&self, item: &str) -> Result<u32, ExprError> {
            Ok(self.items.get(item).copied().unwrap_or(0))
        }

        fn variable(&self, name: &str) -> Result<Value, ExprError> {
            Ok(self.vars.get(name).cloned().unwrap_or(Value::Null))
        }
    }

    fn eval(source: &str) -> Value {
        evaluate(source, &MapContext::default()).expect("evaluation failed")
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("10 - 4 - 3"), Value::Number(3.0));
        assert_eq!(eval("-2 * 3"), Value::Number(-6.0));
        assert_eq!(eval("7 / 2"), Value::Number(3.5));
    }

    #[test]
    fn comparison_and_boolean_operators() {
        assert_eq!(eval("1 < 2 && 2 <= 2"), Value::Bool(true));
        assert_eq!(eval("3 > 4 || !false"), Value::Bool(true));
        assert_eq!(eval("1 === 1"), Value::Bool(true));
        assert_eq!(eval("1 !== 1"), Value::Bool(false));
        assert_eq!(eval("'a' != \"b\""), Value::Bool(true));
        assert_eq!(eval("'abc' < 'abd'"), Value::Bool(true));
    }

    #[test]
    fn equality_does_not_coerce() {
        assert_eq!(eval("1 == '1'"), Value::Bool(false));
        assert_eq!(eval("true == 1"), Value::Bool(false));
    }

    #[test]
    fn text_concatenation() {
        assert_eq!(eval("'x' + 1"), Value::Text("x1".into()));
        assert_eq!(eval("2 + 'y'"), Value::Text("2y".into()));
    }

    #[test]
    fn accessors_read_from_context() {
        let mut ctx = MapContext::default();
        ctx.items.insert("sword".into(), 2);
        ctx.vars.insert("owl".into(), Value::Bool(true));
        ctx.vars.insert("name".into(), Value::Text("Bob".into()));
        assert_eq!(evaluate("item(sword) >= 1", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("item(shield)", &ctx).unwrap(), Value::Number(0.0));
        assert_eq!(evaluate("var(owl) === true", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("var(name) == 'Bob'", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("var(missing)", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn malformed_expressions_are_errors() {
        let ctx = MapContext::default();
        assert!(matches!(evaluate("1 +", &ctx), Err(ExprError::Parse { .. })));
        assert!(matches!(evaluate("owl", &ctx), Err(ExprError::Parse { .. })));
        assert!(matches!(evaluate("item(a b)", &ctx), Err(ExprError::Parse { .. })));
        assert!(matches!(evaluate("", &ctx), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn variables_are_collected_in_source_order() {
        let expression = parse("var(a) > 1 && !(item(x) == var(b))").unwrap();
        assert_eq!(expression.variables(), vec!["a", "b"]);
        assert!(parse("1 + 2").unwrap().variables().is_empty());
    }

    #[test]
    fn ill_typed_arithmetic_fails_but_mixed_ordering_is_false() {
        let ctx = MapContext::default();
        assert!(matches!(evaluate("true - 1", &ctx), Err(ExprError::TypeMismatch { .. })));
        assert_eq!(evaluate("1 < 'a'", &ctx), Ok(Value::Bool(false)));
        assert_eq!(evaluate("var(gold) >= 5", &ctx), Ok(Value::Bool(false)));
        assert_eq!(evaluate("var(gold) < 5", &ctx), Ok(Value::Bool(false)));
        assert!(matches!(evaluate("-'a'", &ctx), Err(ExprError::UnaryTypeMismatch { .. })));
        assert_eq!(evaluate("1 / 0", &ctx), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn standalone_context_refuses_accessors() {
        assert_eq!(evaluate("2 + 3", &Standalone).unwrap(), Value::Number(5.0));
        assert!(matches!(
            evaluate("var(x) + 1", &Standalone),
            Err(ExprError::AccessorNotAllowed { accessor: "var", .. })
        ));
    }

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }
}
