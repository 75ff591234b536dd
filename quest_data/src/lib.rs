//! Shared data model for quest documents.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_quest};
