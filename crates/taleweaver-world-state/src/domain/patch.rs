//! Merge-patches produced by narration and applied to the world state.

use serde::{Deserialize, Serialize};
use taleweaver_campaign::CampaignStructure;
use tracing::warn;
use uuid::Uuid;

use super::world_state::{CurrentScene, WorldState, add_unique};

/// Request to move the party to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneChange {
    /// Node id or node title.
    pub node: String,
    /// Scene description; the node description is used when empty.
    pub description: String,
    /// NPCs on stage.
    pub present_npcs: Vec<String>,
}

/// Request to advance a faction's clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTick {
    /// Faction name.
    pub faction: String,
    /// Segments to fill.
    pub segments: u8,
}

/// Changes to merge into a [`WorldState`]. Empty fields leave state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldStatePatch {
    /// Replacement summary.
    pub summary: Option<String>,
    /// Threads to drop from the story outline.
    pub resolved_threads: Vec<String>,
    /// Threads to append to the story outline.
    pub new_threads: Vec<String>,
    /// Event to record as the newest recent event.
    pub event: Option<String>,
    /// Places named in the narration.
    pub discovered_places: Vec<String>,
    /// Factions named in the narration.
    pub discovered_factions: Vec<String>,
    /// Aspects established by the narration.
    pub new_story_aspects: Vec<String>,
    /// Location change, if the narration moved the party.
    pub scene_change: Option<SceneChange>,
    /// Faction clock advances.
    pub clock_ticks: Vec<ClockTick>,
    /// Victory conditions the narration achieved.
    pub achieved_conditions: Vec<String>,
    /// Updated character descriptions.
    pub character_descriptions: Vec<(Uuid, String)>,
}

/// What a merge actually changed beyond plain field updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchOutcome {
    /// Node the party moved to.
    pub entered_node: Option<String>,
    /// Scene change that did not resolve to a campaign node and was dropped.
    pub rejected_scene: Option<String>,
    /// Factions whose clock filled.
    pub filled_clocks: Vec<String>,
    /// Victory conditions newly achieved.
    pub achieved_conditions: Vec<String>,
}

impl WorldState {
    /// Merges `patch` into the world.
    ///
    /// Scene changes are validated against `campaign`: a node that cannot be
    /// resolved by id or title is dropped rather than stored, so
    /// `current_scene` always references an existing node.
    pub fn apply_patch(
        &mut self,
        patch: &WorldStatePatch,
        campaign: &CampaignStructure,
    ) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();

        if let Some(summary) = patch.summary.as_ref().filter(|s| !s.trim().is_empty()) {
            self.summary.clone_from(summary);
        }

        self.story_outline.retain(|thread| {
            !patch
                .resolved_threads
                .iter()
                .any(|resolved| resolved.trim().eq_ignore_ascii_case(thread))
        });
        for thread in &patch.new_threads {
            add_unique(&mut self.story_outline, thread);
        }

        if let Some(event) = patch.event.as_ref().filter(|e| !e.trim().is_empty()) {
            self.recent_events.push(event.trim());
        }

        for place in &patch.discovered_places {
            add_unique(&mut self.places, place);
            add_unique(&mut self.known_places, place);
        }
        for name in &patch.discovered_factions {
            if let Some(faction) = campaign
                .factions
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
            {
                add_unique(&mut self.known_factions, &faction.name);
            }
        }
        for aspect in &patch.new_story_aspects {
            add_unique(&mut self.story_aspects, aspect);
        }

        if let Some(change) = &patch.scene_change {
            self.apply_scene_change(change, campaign, &mut outcome);
        }

        for tick in &patch.clock_ticks {
            let Some(faction) = self
                .factions
                .iter_mut()
                .find(|f| f.name.eq_ignore_ascii_case(tick.faction.trim()))
            else {
                warn!(faction = %tick.faction, "clock tick for unknown faction ignored");
                continue;
            };
            if faction.clock.advance(tick.segments).filled {
                let event = format!(
                    "{} achieved its aim: {}",
                    faction.name, faction.clock.objective
                );
                outcome.filled_clocks.push(faction.name.clone());
                self.recent_events.push(event);
            }
        }

        if let Some(resolution) = self.resolution.as_mut() {
            for condition in &patch.achieved_conditions {
                if resolution.mark_achieved(condition) {
                    outcome.achieved_conditions.push(condition.trim().to_owned());
                }
            }
        }

        for (character_id, description) in &patch.character_descriptions {
            if let Some(character) = self.character_mut(*character_id) {
                character.description.clone_from(description);
            }
        }

        outcome
    }

    fn apply_scene_change(
        &mut self,
        change: &SceneChange,
        campaign: &CampaignStructure,
        outcome: &mut PatchOutcome,
    ) {
        let target = campaign
            .node(change.node.trim())
            .or_else(|| campaign.node_by_title(&change.node));
        let Some(node) = target else {
            warn!(node = %change.node, "scene change to unknown node dropped");
            outcome.rejected_scene = Some(change.node.clone());
            return;
        };

        let description = if change.description.trim().is_empty() {
            node.description.clone()
        } else {
            change.description.clone()
        };
        self.current_scene = Some(CurrentScene {
            node_id: node.id.clone(),
            description,
            present_npcs: change.present_npcs.clone(),
        });
        add_unique(&mut self.places, &node.title);
        add_unique(&mut self.known_places, &node.title);
        outcome.entered_node = Some(node.id.clone());
    }
}
