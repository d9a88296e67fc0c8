//! Domain model for the Character context.

pub mod character;
pub mod stats;
