//! The generated campaign structure and its structural invariants.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::faction_clock::{CLOCK_SEGMENTS, FactionClock};

const ISSUE_COUNT: usize = 2;
const ASPECT_COUNT: RangeInclusive<usize> = 3..=5;
const FACTION_COUNT: RangeInclusive<usize> = 2..=3;
const NODE_COUNT: RangeInclusive<usize> = 5..=7;
const LEAD_COUNT: RangeInclusive<usize> = 2..=3;
const FACE_COUNT: RangeInclusive<usize> = 1..=2;
const NODE_ASPECT_COUNT: usize = 2;
const VICTORY_CONDITION_COUNT: RangeInclusive<usize> = 2..=3;

/// Structural violations found while validating a campaign.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid campaign structure: {}", .violations.join("; "))]
pub struct CampaignError {
    /// Every violation, in discovery order.
    pub violations: Vec<String>,
}

/// A current or impending campaign issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignIssue {
    /// Issue phrased as an aspect.
    pub name: String,
    /// Longer explanation.
    pub description: String,
}

/// A faction pursuing its own agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    /// Faction name; unique within the campaign.
    pub name: String,
    /// Who they are.
    pub description: String,
    /// Threat clock.
    pub clock: FactionClock,
}

/// A named NPC attached to a situation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    /// NPC name.
    pub name: String,
    /// Role in the situation.
    pub role: String,
}

/// A situation/location vertex in the leads graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationNode {
    /// Stable node identifier referenced by the current scene.
    pub id: String,
    /// Title; leads reference nodes by title.
    pub title: String,
    /// What is going on here.
    pub description: String,
    /// Whether play begins here.
    pub is_starting_node: bool,
    /// Titles of the nodes this situation points toward.
    pub leads: Vec<String>,
    /// What can be won or lost.
    pub stakes: String,
    /// Obstacles.
    pub challenges: Vec<String>,
    /// NPCs present.
    pub faces: Vec<Face>,
    /// Situation aspects.
    pub aspects: Vec<String>,
}

/// One way the campaign can be won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictoryCondition {
    /// What has to happen.
    pub description: String,
    /// Whether the players have achieved it.
    pub achieved: bool,
}

/// Where the campaign is heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Overall goal.
    pub primary_objective: String,
    /// Secret the GM reveals late.
    pub hidden_truth: String,
    /// Victory conditions.
    pub victory_conditions: Vec<VictoryCondition>,
    /// Events that pull the threads together.
    pub convergence_triggers: Vec<String>,
    /// Set once the finale can be played.
    pub climax_ready: bool,
    /// Where the finale happens.
    pub climax_location: String,
    /// Factions involved in the finale.
    pub involved_factions: Vec<String>,
}

impl Resolution {
    /// Whether every victory condition has been achieved.
    #[must_use]
    pub fn all_victory_conditions_met(&self) -> bool {
        !self.victory_conditions.is_empty() && self.victory_conditions.iter().all(|v| v.achieved)
    }

    /// Whether the campaign has reached its end.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.climax_ready || self.all_victory_conditions_met()
    }

    /// Marks the condition whose description matches (case-insensitively) as
    /// achieved. Sets `climax_ready` once every condition is met. Returns
    /// whether a condition changed state.
    pub fn mark_achieved(&mut self, description: &str) -> bool {
        let Some(condition) = self
            .victory_conditions
            .iter_mut()
            .find(|v| v.description.eq_ignore_ascii_case(description.trim()))
        else {
            return false;
        };
        if condition.achieved {
            return false;
        }
        condition.achieved = true;
        if self.all_victory_conditions_met() {
            self.climax_ready = true;
        }
        true
    }
}

/// The campaign content graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStructure {
    /// Exactly two issues.
    pub campaign_issues: Vec<CampaignIssue>,
    /// Three to five campaign aspects.
    pub campaign_aspects: Vec<String>,
    /// Two to three factions.
    pub factions: Vec<Faction>,
    /// Five to seven situation nodes.
    pub nodes: Vec<SituationNode>,
    /// Campaign resolution.
    pub resolution: Resolution,
}

impl CampaignStructure {
    /// The node play begins at.
    #[must_use]
    pub fn starting_node(&self) -> Option<&SituationNode> {
        self.nodes.iter().find(|n| n.is_starting_node)
    }

    /// Looks a node up by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&SituationNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks a node up by title, case-insensitively.
    #[must_use]
    pub fn node_by_title(&self, title: &str) -> Option<&SituationNode> {
        self.nodes
            .iter()
            .find(|n| n.title.eq_ignore_ascii_case(title.trim()))
    }

    /// Whether `id` names a node of this campaign.
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Nodes reachable in one step from `id`.
    #[must_use]
    pub fn leads_from(&self, id: &str) -> Vec<&SituationNode> {
        self.node(id)
            .map(|node| {
                node.leads
                    .iter()
                    .filter_map(|title| self.node_by_title(title))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks a faction up by name, case-insensitively.
    pub fn faction_mut(&mut self, name: &str) -> Option<&mut Faction> {
        self.factions
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Checks every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns `CampaignError` listing all violations found.
    pub fn validate(&self) -> Result<(), CampaignError> {
        let mut violations = Vec::new();

        if self.campaign_issues.len() != ISSUE_COUNT {
            violations.push(format!(
                "expected {ISSUE_COUNT} campaign issues, found {}",
                self.campaign_issues.len()
            ));
        }
        check_count(
            &mut violations,
            "campaign aspects",
            self.campaign_aspects.len(),
            &ASPECT_COUNT,
        );
        check_count(&mut violations, "factions", self.factions.len(), &FACTION_COUNT);
        for faction in &self.factions {
            validate_faction(faction, &mut violations);
        }

        check_count(&mut violations, "nodes", self.nodes.len(), &NODE_COUNT);
        let starting = self.nodes.iter().filter(|n| n.is_starting_node).count();
        if starting != 1 {
            violations.push(format!("expected exactly one starting node, found {starting}"));
        }
        self.validate_nodes(&mut violations);

        check_count(
            &mut violations,
            "victory conditions",
            self.resolution.victory_conditions.len(),
            &VICTORY_CONDITION_COUNT,
        );

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CampaignError { violations })
        }
    }

    fn validate_nodes(&self, violations: &mut Vec<String>) {
        let mut ids = HashSet::new();
        let mut titles = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                violations.push(format!("duplicate node id '{}'", node.id));
            }
            if !titles.insert(node.title.to_lowercase()) {
                violations.push(format!("duplicate node title '{}'", node.title));
            }
        }

        for node in &self.nodes {
            check_count(
                violations,
                &format!("leads on node '{}'", node.title),
                node.leads.len(),
                &LEAD_COUNT,
            );
            for lead in &node.leads {
                match self.node_by_title(lead) {
                    None => violations.push(format!(
                        "node '{}' leads to unknown node '{lead}'",
                        node.title
                    )),
                    Some(target) if target.id == node.id => {
                        violations.push(format!("node '{}' leads to itself", node.title));
                    }
                    Some(_) => {}
                }
            }
            check_count(
                violations,
                &format!("faces on node '{}'", node.title),
                node.faces.len(),
                &FACE_COUNT,
            );
            if node.aspects.len() != NODE_ASPECT_COUNT {
                violations.push(format!(
                    "node '{}' has {} aspects, expected {NODE_ASPECT_COUNT}",
                    node.title,
                    node.aspects.len()
                ));
            }
        }
    }
}

fn validate_faction(faction: &Faction, violations: &mut Vec<String>) {
    let clock = &faction.clock;
    if clock.max != CLOCK_SEGMENTS {
        violations.push(format!(
            "faction '{}' clock has {} segments, expected {CLOCK_SEGMENTS}",
            faction.name, clock.max
        ));
    }
    if clock.value > clock.max {
        violations.push(format!(
            "faction '{}' clock value {} exceeds max {}",
            faction.name, clock.value, clock.max
        ));
    }
    if clock.steps.len() != usize::from(CLOCK_SEGMENTS) {
        violations.push(format!(
            "faction '{}' clock has {} step descriptions, expected {CLOCK_SEGMENTS}",
            faction.name,
            clock.steps.len()
        ));
    }
}

fn check_count(
    violations: &mut Vec<String>,
    what: &str,
    actual: usize,
    expected: &RangeInclusive<usize>,
) {
    if !expected.contains(&actual) {
        violations.push(format!(
            "expected {}-{} {what}, found {actual}",
            expected.start(),
            expected.end()
        ));
    }
}
