//! Taleweaver: Campaign Structure bounded context.
//!
//! The semi-static content graph generated once per campaign: issues,
//! aspects, factions with threat clocks, situation nodes linked by leads,
//! and the resolution the campaign is driving toward.

pub mod domain;

pub use domain::faction_clock::{ClockAdvance, FactionClock};
pub use domain::structure::{
    CampaignError, CampaignIssue, CampaignStructure, Face, Faction, Resolution, SituationNode,
    VictoryCondition,
};
