//! Application layer for the Session context.

pub mod campaign;
pub mod command_handlers;
pub mod context;
pub mod idle;
pub mod pipeline;
pub mod query_handlers;
pub mod repository;

pub use context::{SessionCommandResult, SessionContext};
