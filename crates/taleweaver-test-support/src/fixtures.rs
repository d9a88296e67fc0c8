//! Shared fixtures.

use chrono::{DateTime, TimeZone, Utc};
use taleweaver_campaign::CampaignStructure;
use taleweaver_narrative::skeleton_campaign;
use taleweaver_world_state::SettingCategory;

/// The instant every deterministic test starts at.
///
/// # Panics
///
/// Never; the date is a valid constant.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A structurally valid five-node campaign starting at `node-1`.
#[must_use]
pub fn sample_campaign() -> CampaignStructure {
    skeleton_campaign("A drowned city of canals and bells", SettingCategory::Fantasy)
}
