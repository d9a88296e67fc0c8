//! Shared test mocks and fixtures for the Taleweaver game master engine.

mod clock;
mod fixtures;
mod oracle;
mod repository;

pub use clock::{FixedClock, ManualClock};
pub use fixtures::{fixed_now, sample_campaign};
pub use oracle::{OracleCalls, ScriptedOracle};
pub use repository::{FailingDocumentStore, GatedDocumentStore};
