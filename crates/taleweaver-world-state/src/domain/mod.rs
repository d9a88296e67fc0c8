//! Domain model for the World State context.

pub mod patch;
pub mod progress;
pub mod recent_events;
pub mod setting;
pub mod world_state;
