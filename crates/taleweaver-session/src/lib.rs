//! Taleweaver: Session bounded context.
//!
//! Owns the `GameSession` aggregate and everything that mutates it: the
//! turn coordinator, the session lifecycle, the action resolution pipeline
//! with its single-step undo, campaign (re)generation, and idle detection.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;

pub use application::{SessionCommandResult, SessionContext};
pub use config::PipelineConfig;
pub use error::{ErrorClass, SessionError};
