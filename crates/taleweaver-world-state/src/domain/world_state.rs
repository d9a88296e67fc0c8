//! The mutable narrative memory of a campaign.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taleweaver_campaign::{CampaignStructure, Faction, Resolution};
use taleweaver_character::Character;
use tracing::debug;
use uuid::Uuid;

use super::progress::SessionProgress;
use super::recent_events::RecentEvents;
use super::setting::SettingCategory;

/// Default idle timeout before a session is paused automatically.
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: u32 = 120;

/// Where the party currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentScene {
    /// Id of a node in the campaign structure.
    pub node_id: String,
    /// What the scene looks like right now.
    pub description: String,
    /// NPCs on stage.
    pub present_npcs: Vec<String>,
}

/// Narrative memory shared by every player of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Running summary of the story so far.
    pub summary: String,
    /// Open plot threads, in the order they were opened.
    pub story_outline: Vec<String>,
    /// Last few events, newest first.
    pub recent_events: RecentEvents,
    /// Authoritative copy of the party.
    pub characters: Vec<Character>,
    /// Every place the GM has mentioned.
    pub places: Vec<String>,
    /// Places the party has discovered.
    pub known_places: Vec<String>,
    /// Factions the party has discovered.
    pub known_factions: Vec<String>,
    /// Aspects established during play.
    pub story_aspects: Vec<String>,
    /// Scene on stage; `None` until play begins.
    pub current_scene: Option<CurrentScene>,
    /// Live faction clocks, mirrored from the campaign structure.
    pub factions: Vec<Faction>,
    /// Genre of the setting.
    pub setting_category: SettingCategory,
    /// Session number and pacing.
    pub session_progress: SessionProgress,
    /// Victory tracking, mirrored from the campaign structure.
    pub resolution: Option<Resolution>,
    /// Last player activity.
    pub last_activity: DateTime<Utc>,
    /// Whether idle sessions are paused automatically.
    pub auto_end_enabled: bool,
    /// Minutes of inactivity before an automatic pause.
    pub idle_timeout_minutes: u32,
    /// Whether the idle warning has been raised since the last activity.
    pub idle_warning_shown: bool,
}

impl WorldState {
    /// Creates an empty world stamped with `now`.
    #[must_use]
    pub fn new(setting_category: SettingCategory, now: DateTime<Utc>) -> Self {
        Self {
            summary: String::new(),
            story_outline: Vec::new(),
            recent_events: RecentEvents::new(),
            characters: Vec::new(),
            places: Vec::new(),
            known_places: Vec::new(),
            known_factions: Vec::new(),
            story_aspects: Vec::new(),
            current_scene: None,
            factions: Vec::new(),
            setting_category,
            session_progress: SessionProgress::default(),
            resolution: None,
            last_activity: now,
            auto_end_enabled: true,
            idle_timeout_minutes: DEFAULT_IDLE_TIMEOUT_MINUTES,
            idle_warning_shown: false,
        }
    }

    /// Looks a character up by id.
    #[must_use]
    pub fn character(&self, id: Uuid) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Looks a character up by id, mutably.
    pub fn character_mut(&mut self, id: Uuid) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Records player activity and clears a pending idle warning.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.idle_warning_shown = false;
    }

    /// Mirrors factions and resolution from a (re)generated campaign.
    ///
    /// Live clock values of factions that survive regeneration are kept.
    /// A scene whose node no longer exists is moved to the starting node.
    pub fn mirror_campaign(&mut self, campaign: &CampaignStructure) {
        let previous = std::mem::take(&mut self.factions);
        self.factions = campaign
            .factions
            .iter()
            .map(|faction| {
                let mut mirrored = faction.clone();
                if let Some(live) = previous
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(&faction.name))
                {
                    mirrored.clock.value = live.clock.value.min(mirrored.clock.max);
                }
                mirrored
            })
            .collect();
        self.known_factions
            .retain(|known| campaign.factions.iter().any(|f| f.name.eq_ignore_ascii_case(known)));

        self.resolution = Some(campaign.resolution.clone());

        for node in &campaign.nodes {
            add_unique(&mut self.places, &node.title);
        }

        let scene_is_valid = self
            .current_scene
            .as_ref()
            .is_some_and(|scene| campaign.contains_node(&scene.node_id));
        if self.current_scene.is_some() && !scene_is_valid {
            debug!("current scene no longer exists; returning to starting node");
            self.enter_starting_scene(campaign);
        }
    }

    /// Places the party on the campaign's starting node.
    pub fn enter_starting_scene(&mut self, campaign: &CampaignStructure) {
        if let Some(start) = campaign.starting_node() {
            self.current_scene = Some(CurrentScene {
                node_id: start.id.clone(),
                description: start.description.clone(),
                present_npcs: start.faces.iter().map(|f| f.name.clone()).collect(),
            });
            add_unique(&mut self.known_places, &start.title);
        }
    }

    /// Whether the current scene references a node of `campaign`.
    #[must_use]
    pub fn scene_is_consistent_with(&self, campaign: &CampaignStructure) -> bool {
        self.current_scene
            .as_ref()
            .is_none_or(|scene| campaign.contains_node(&scene.node_id))
    }
}

/// Appends `value` unless an entry equal ignoring case is present.
/// Returns whether it was added.
pub(crate) fn add_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        return false;
    }
    list.push(value.to_owned());
    true
}
