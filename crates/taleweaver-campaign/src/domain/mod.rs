//! Domain model for the Campaign Structure context.

pub mod faction_clock;
pub mod structure;
