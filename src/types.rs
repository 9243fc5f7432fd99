use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::warn;

use crate::bracket::Bracket;

// ── Constants ──────────────────────────────────────────────────────────

pub const CONFIG_FILE_NAME: &str = "bracket-engine.json";
pub const DEFAULT_TEMPLATE_PATH: &str = "brackets/template.json";
pub const DEFAULT_ROSTER_PATH: &str = "brackets/roster.json";
pub const DEFAULT_STATE_PATH: &str = "brackets/state.json";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const LOG_FILE_NAME: &str = "bracket-engine.log";

// ── Shared state type aliases ──────────────────────────────────────────

pub type MatchId = u64;
pub type TeamId = u32;
pub type SharedBracket = Arc<Mutex<BracketSession>>;

// ── Roster ─────────────────────────────────────────────────────────────

/// A team as supplied by team management. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    #[serde(default)]
    pub seed_number: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<String>,
}

impl Team {
    pub fn new(id: TeamId, seed_number: Option<u32>, name: impl Into<String>) -> Self {
        Team {
            id,
            seed_number,
            name: name.into(),
            players: Vec::new(),
        }
    }
}

// ── Matches ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinnerSlot {
    #[default]
    None,
    Slot1,
    Slot2,
}

impl WinnerSlot {
    /// Higher score wins; a tie decides nothing.
    pub fn from_scores(score1: u32, score2: u32) -> Self {
        if score1 > score2 {
            WinnerSlot::Slot1
        } else if score2 > score1 {
            WinnerSlot::Slot2
        } else {
            WinnerSlot::None
        }
    }

    /// Zero-based slot index of the winner.
    pub fn index(self) -> Option<usize> {
        match self {
            WinnerSlot::None => None,
            WinnerSlot::Slot1 => Some(0),
            WinnerSlot::Slot2 => Some(1),
        }
    }

    pub fn is_decided(self) -> bool {
        self != WinnerSlot::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSpec {
    pub id: MatchId,
    pub order: u64,
    #[serde(default)]
    pub phase: String,
    pub slot1: String,
    pub slot2: String,
    #[serde(default)]
    pub score1: Option<u32>,
    #[serde(default)]
    pub score2: Option<u32>,
    #[serde(default)]
    pub winner_slot: WinnerSlot,
}

impl MatchSpec {
    pub fn new(id: MatchId, order: u64, slot1: impl Into<String>, slot2: impl Into<String>) -> Self {
        MatchSpec {
            id,
            order,
            phase: String::new(),
            slot1: slot1.into(),
            slot2: slot2.into(),
            score1: None,
            score2: None,
            winner_slot: WinnerSlot::None,
        }
    }

    pub fn raw_slots(&self) -> [&str; 2] {
        [self.slot1.as_str(), self.slot2.as_str()]
    }

    pub fn clear_score(&mut self) {
        self.score1 = None;
        self.score2 = None;
        self.winner_slot = WinnerSlot::None;
    }
}

// ── Random draw ────────────────────────────────────────────────────────

/// Inclusive seed range a team is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Band {
    pub min: u32,
    pub max: u32,
}

impl Band {
    pub fn new(min: u32, max: u32) -> Self {
        Band { min, max }
    }

    pub fn contains(&self, seed: u32) -> bool {
        seed >= self.min && seed <= self.max
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawEntry {
    pub band: Band,
    pub occurrence: u32,
    pub team_id: TeamId,
}

/// Occurrence-to-team bindings produced by one draw.
///
/// Persisted as a flat list of entries; in memory it is keyed by
/// `(band, occurrence)`. A team is bound at most once per band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DrawEntry>", into = "Vec<DrawEntry>")]
pub struct DrawBinding {
    entries: BTreeMap<(Band, u32), TeamId>,
}

impl DrawBinding {
    pub fn new() -> Self {
        DrawBinding::default()
    }

    /// Returns false when the occurrence is taken or the team already holds
    /// another occurrence of the same band.
    pub fn bind(&mut self, band: Band, occurrence: u32, team_id: TeamId) -> bool {
        if self.entries.contains_key(&(band, occurrence)) {
            return false;
        }
        if self.team_occurrence(band, team_id).is_some() {
            return false;
        }
        self.entries.insert((band, occurrence), team_id);
        true
    }

    pub fn get(&self, band: Band, occurrence: u32) -> Option<TeamId> {
        self.entries.get(&(band, occurrence)).copied()
    }

    pub fn team_occurrence(&self, band: Band, team_id: TeamId) -> Option<u32> {
        self.entries
            .iter()
            .find(|((b, _), id)| *b == band && **id == team_id)
            .map(|((_, occurrence), _)| *occurrence)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = DrawEntry> + '_ {
        self.entries
            .iter()
            .map(|((band, occurrence), team_id)| DrawEntry {
                band: *band,
                occurrence: *occurrence,
                team_id: *team_id,
            })
    }
}

impl From<Vec<DrawEntry>> for DrawBinding {
    fn from(entries: Vec<DrawEntry>) -> Self {
        let mut binding = DrawBinding::new();
        for entry in entries {
            if !binding.bind(entry.band, entry.occurrence, entry.team_id) {
                warn!(
                    "dropping draw entry: band {} #{} -> team {} clashes with an earlier binding",
                    entry.band, entry.occurrence, entry.team_id
                );
            }
        }
        binding
    }
}

impl From<DrawBinding> for Vec<DrawEntry> {
    fn from(binding: DrawBinding) -> Self {
        binding.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDrawReport {
    pub band: Band,
    pub candidates: usize,
    pub bound: usize,
    pub unbound: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawReport {
    pub bands: Vec<BandDrawReport>,
}

impl DrawReport {
    pub fn unbound_total(&self) -> usize {
        self.bands.iter().map(|band| band.unbound.len()).sum()
    }
}

// ── Resolved view ──────────────────────────────────────────────────────

/// Winner and loser of a decided match, derived from the rebuild pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub winner_team_id: Option<TeamId>,
    pub loser_team_id: Option<TeamId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchState {
    Unresolved,
    Ready,
    Decided,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlot {
    pub team_id: Option<TeamId>,
    pub team_name: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMatch {
    pub id: MatchId,
    pub order: u64,
    pub phase: String,
    pub slots: [ResolvedSlot; 2],
    pub score1: Option<u32>,
    pub score2: Option<u32>,
    pub winner_slot: WinnerSlot,
    pub state: MatchState,
}

impl ResolvedMatch {
    pub fn team_ids(&self) -> [Option<TeamId>; 2] {
        [self.slots[0].team_id, self.slots[1].team_id]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedView {
    pub matches: Vec<ResolvedMatch>,
    pub outcomes: BTreeMap<MatchId, MatchOutcome>,
}

impl ResolvedView {
    pub fn get(&self, match_id: MatchId) -> Option<&ResolvedMatch> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn outcome(&self, match_id: MatchId) -> Option<&MatchOutcome> {
        self.outcomes.get(&match_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub match_spec: MatchSpec,
    pub changed: Vec<MatchId>,
}

// ── Session ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BracketSession {
    pub bracket: Option<Bracket>,
    pub state_path: Option<PathBuf>,
    pub draw_seed: Option<u64>,
    pub draws: u64,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub template_path: String,
    pub roster_path: String,
    pub state_path: String,
    pub log_dir: String,
    pub log_filter: String,
    pub draw_seed: Option<u64>,
    pub reroll_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_path: String::new(),
            roster_path: String::new(),
            state_path: String::new(),
            log_dir: String::new(),
            log_filter: String::new(),
            draw_seed: None,
            reroll_on_start: false,
        }
    }
}
