//! Taleweaver: World State bounded context.
//!
//! The authoritative narrative memory of a campaign. It is plain data,
//! mutated only through [`WorldStatePatch`] merges.

pub mod domain;

pub use domain::patch::{ClockTick, PatchOutcome, SceneChange, WorldStatePatch};
pub use domain::progress::{Beat, SessionProgress};
pub use domain::recent_events::{MAX_RECENT_EVENTS, RecentEvents};
pub use domain::setting::SettingCategory;
pub use domain::world_state::{CurrentScene, DEFAULT_IDLE_TIMEOUT_MINUTES, WorldState};
