//! Ordered item quantities owned by a session.

use crate::item::ItemStack;

/// At most one stack per item, kept in acquisition order. Stacks never hold zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` of `item`, merging into an existing stack.
    pub fn add(&mut self, item: &str, amount: u32) {
        if amount == 0 {
            return;
        }
        match self.stacks.iter_mut().find(|stack| stack.item == item) {
            Some(stack) => stack.amount = stack.amount.saturating_add(amount),
            None => self.stacks.push(ItemStack::new(item, amount)),
        }
    }

    /// Remove `amount` of `item` if at least that many are held.
    ///
    /// Returns `false` and leaves the inventory untouched otherwise.
    pub fn consume(&mut self, item: &str, amount: u32) -> bool {
        let Some(index) = self.stacks.iter().position(|stack| stack.item == item) else {
            return amount == 0;
        };
        let stack = &mut self.stacks[index];
        if stack.amount < amount {
            return false;
        }
        stack.amount -= amount;
        if stack.amount == 0 {
            self.stacks.remove(index);
        }
        true
    }

    /// Drop the whole stack for `item`, returning it if present.
    pub fn remove(&mut self, item: &str) -> Option<ItemStack> {
        let index = self.stacks.iter().position(|stack| stack.item == item)?;
        Some(self.stacks.remove(index))
    }

    pub fn amount_of(&self, item: &str) -> u32 {
        self.stacks
            .iter()
            .find(|stack| stack.item == item)
            .map_or(0, |stack| stack.amount)
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
