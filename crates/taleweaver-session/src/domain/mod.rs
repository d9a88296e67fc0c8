//! Domain layer for the Session context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod lifecycle;
pub mod message;
pub mod turn;
