//! Inline `[if <expr>]...[/if]` templating for screen text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::condition::Condition;
use crate::expr::{ExprContext, ExprError};

lazy_static! {
    static ref IF_TAG: Regex = Regex::new(r"\[if ([^\]]+)\]([^\[]*)\[/if\]").expect("if-tag pattern is valid");
}

/// Keep the body of each `[if]` tag whose expression holds, drop the others.
///
/// Bodies cannot contain `[`, so tags do not nest.
///
/// # Errors
/// The first expression error met while scanning the text.
pub fn prepare_text(text: &str, ctx: &dyn ExprContext) -> Result<String, ExprError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in IF_TAG.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        if Condition::new(vec![caps[1].to_string()]).evaluate(ctx)? {
            out.push_str(&caps[2]);
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Standalone, Value};

    struct Owl(bool);

    impl ExprContext for Owl {
        fn item_count(&self, _item: &str) -> Result<u32, ExprError> {
            Ok(0)
        }

        fn variable(&self, _name: &str) -> Result<Value, ExprError> {
            Ok(Value::Bool(self.0))
        }
    }

    #[test]
    fn keeps_only_true_bodies() {
        let text = "A tree.[if var(owl)] An owl watches you.[/if][if !var(owl)] It is quiet.[/if]";
        assert_eq!(prepare_text(text, &Owl(true)).unwrap(), "A tree. An owl watches you.");
        assert_eq!(prepare_text(text, &Owl(false)).unwrap(), "A tree. It is quiet.");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(prepare_text("no tags [here]", &Standalone).unwrap(), "no tags [here]");
    }

    #[test]
    fn bad_tag_expression_is_an_error() {
        assert!(prepare_text("[if 1 +]x[/if]", &Standalone).is_err());
    }
}
