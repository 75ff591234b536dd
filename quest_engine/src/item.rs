//! Items and item stacks.

use std::fmt;

/// Something the player can own. Immutable once the graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub internal_name: String,
    pub title: String,
}

impl Item {
    pub fn new(internal_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            title: title.into(),
        }
    }
}

/// A quantity of one item.
///
/// Stacks refer to items by internal name; titles are looked up in the graph
/// when a stack is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: String,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, amount: u32) -> Self {
        Self {
            item: item.into(),
            amount,
        }
    }
}

/// Display helper pairing a stack with its item title: `Title` or `Title xN`.
pub struct StackLabel<'a> {
    pub title: &'a str,
    pub amount: u32,
}

impl fmt::Display for StackLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amount > 1 {
            write!(f, "{} x{}", self.title, self.amount)
        } else {
            write!(f, "{}", self.title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_shows_multiplier_only_above_one() {
        assert_eq!(StackLabel { title: "Stone", amount: 1 }.to_string(), "Stone");
        assert_eq!(StackLabel { title: "Stone", amount: 3 }.to_string(), "Stone x3");
    }
}
