//! Route modules.

pub mod campaign;
pub mod events;
pub mod health;
pub mod session;
