//! Crafting recipes.

use log::info;

use crate::inventory::Inventory;
use crate::item::ItemStack;

/// Ingredients consumed and results produced by one craft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub internal_name: String,
    pub ingredients: Vec<ItemStack>,
    pub results: Vec<ItemStack>,
}

impl Recipe {
    /// True when the inventory holds every ingredient in the required amount.
    pub fn can_craft(&self, inventory: &Inventory) -> bool {
        self.ingredients
            .iter()
            .all(|stack| inventory.amount_of(&stack.item) >= stack.amount)
    }

    /// Consume the ingredients and add the results. Does not re-check feasibility.
    pub fn craft(&self, inventory: &mut Inventory) {
        for stack in &self.ingredients {
            inventory.consume(&stack.item, stack.amount);
        }
        for stack in &self.results {
            inventory.add(&stack.item, stack.amount);
        }
        info!("crafted recipe '{}'", self.internal_name);
    }
}
