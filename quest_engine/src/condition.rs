//! Guards: OR-combined lists of expressions.

use log::warn;

use crate::expr::{self, ExprContext, ExprError};

/// A guard attached to a choice or fork. An empty condition always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    expressions: Vec<String>,
}

impl Condition {
    pub fn new(expressions: Vec<String>) -> Self {
        Self { expressions }
    }

    pub fn always() -> Self {
        Self::default()
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    /// Evaluate the guard: true if any expression is truthy.
    ///
    /// Every expression is parsed before any is evaluated, so a malformed entry
    /// fails the guard even when an earlier one would have matched. Evaluation
    /// stops at the first truthy expression. An expression that parses but
    /// fails at runtime (say `var(gold) - 1` with `gold` unset) is logged and
    /// counts as false.
    ///
    /// # Errors
    /// Parse errors from any expression.
    pub fn evaluate(&self, ctx: &dyn ExprContext) -> Result<bool, ExprError> {
        let parsed = self
            .expressions
            .iter()
            .map(|source| expr::parse(source))
            .collect::<Result<Vec<_>, _>>()?;
        if parsed.is_empty() {
            return Ok(true);
        }
        for (source, expression) in self.expressions.iter().zip(&parsed) {
            match expression.eval(ctx) {
                Ok(value) if value.is_truthy() => return Ok(true),
                Ok(_) => {},
                Err(e) => warn!("guard \"{source}\" treated as false: {e}"),
            }
        }
        Ok(false)
    }
}

impl From<&quest_data::OneOrMany> for Condition {
    fn from(value: &quest_data::OneOrMany) -> Self {
        Self::new(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Standalone, Value};

    struct Counts;

    impl ExprContext for Counts {
        fn item_count(&self, item: &str) -> Result<u32, ExprError> {
            Ok(u32::from(item == "sword"))
        }

        fn variable(&self, _name: &str) -> Result<Value, ExprError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn empty_condition_is_true() {
        assert!(Condition::always().evaluate(&Standalone).unwrap());
    }

    #[test]
    fn expressions_are_or_combined() {
        let cond = Condition::new(vec!["item(shield) > 0".into(), "item(sword) > 0".into()]);
        assert!(cond.evaluate(&Counts).unwrap());
        let cond = Condition::new(vec!["item(shield) > 0".into(), "var(x)".into()]);
        assert!(!cond.evaluate(&Counts).unwrap());
    }

    #[test]
    fn runtime_failures_count_as_false() {
        let cond = Condition::new(vec!["var(gold) - 1 > 0".into(), "var(gold) >= 5".into()]);
        assert_eq!(cond.evaluate(&Counts), Ok(false));
        let cond = Condition::new(vec!["var(gold) * 2".into(), "item(sword) == 1".into()]);
        assert_eq!(cond.evaluate(&Counts), Ok(true));
    }

    #[test]
    fn malformed_entry_fails_the_guard() {
        let cond = Condition::new(vec!["true".into(), "1 +".into()]);
        assert!(matches!(cond.evaluate(&Counts), Err(ExprError::Parse { .. })));
    }
}
