//! Commands: requests to change one aggregate on behalf of a user.

use uuid::Uuid;

use crate::identity::UserId;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted command name, e.g. `session.claim_slot`.
    fn command_type(&self) -> &'static str;

    /// Id shared by every event the command produces.
    fn correlation_id(&self) -> Uuid;

    /// The aggregate this command targets.
    fn aggregate_id(&self) -> Uuid;

    /// User the command runs for; permission checks are made against it.
    fn issued_by(&self) -> &UserId;
}
