use serde::{Deserialize, Serialize};
use std::{
  collections::{HashMap, HashSet},
  fs,
  path::Path,
};
use tracing::warn;

use crate::error::BracketError;
use crate::slot::{index_occurrences, SlotReference};
use crate::types::{MatchId, MatchSpec, Team, WinnerSlot};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchTemplate {
  pub id: MatchId,
  pub order: u64,
  pub slot1: String,
  pub slot2: String,
  #[serde(default)]
  pub score1: Option<u32>,
  #[serde(default)]
  pub score2: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTemplate {
  pub name: String,
  #[serde(default)]
  pub matches: Vec<MatchTemplate>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketTemplate {
  #[serde(default)]
  pub name: String,
  pub phases: Vec<PhaseTemplate>,
}

impl BracketTemplate {
  /// Flattens phases into match records sorted by `order`. Scores already
  /// present in the template decide their match with the usual rule.
  pub fn into_matches(self) -> Vec<MatchSpec> {
    let mut matches = Vec::new();
    for phase in self.phases {
      for m in phase.matches {
        let winner_slot = match (m.score1, m.score2) {
          (Some(a), Some(b)) => WinnerSlot::from_scores(a, b),
          _ => WinnerSlot::None,
        };
        matches.push(MatchSpec {
          id: m.id,
          order: m.order,
          phase: phase.name.clone(),
          slot1: m.slot1,
          slot2: m.slot2,
          score1: m.score1,
          score2: m.score2,
          winner_slot,
        });
      }
    }
    matches.sort_by_key(|m| (m.order, m.id));
    matches
  }
}

/// Rejects templates whose resolution order would be ill-defined: duplicate
/// ids or orders, and winner/loser references that do not point at a match
/// with a strictly smaller order.
pub fn validate_matches(matches: &[MatchSpec]) -> Result<(), BracketError> {
  if matches.is_empty() {
    return Err(BracketError::EmptyTemplate);
  }
  let mut order_by_id: HashMap<MatchId, u64> = HashMap::with_capacity(matches.len());
  let mut orders = HashSet::with_capacity(matches.len());
  for m in matches {
    if order_by_id.insert(m.id, m.order).is_some() {
      return Err(BracketError::DuplicateMatchId(m.id));
    }
    if !orders.insert(m.order) {
      return Err(BracketError::DuplicateOrder(m.order));
    }
  }

  for (m, slots) in matches.iter().zip(index_occurrences(matches)) {
    for target in slots.iter().filter_map(SlotReference::depends_on) {
      let Some(target_order) = order_by_id.get(&target).copied() else {
        warn!("match {} references unknown match {target}", m.id);
        return Err(BracketError::UnknownReference { match_id: m.id, target });
      };
      if target_order >= m.order {
        warn!("match {} references later match {target}", m.id);
        return Err(BracketError::ForwardReference { match_id: m.id, target });
      }
    }
  }
  Ok(())
}

pub fn parse_template(data: &str, path: &Path) -> Result<BracketTemplate, BracketError> {
  serde_json::from_str::<BracketTemplate>(data).map_err(|e| BracketError::parse(path, e))
}

pub fn load_template_from(path: &Path) -> Result<BracketTemplate, BracketError> {
  let data = fs::read_to_string(path).map_err(|e| BracketError::io(path, e))?;
  parse_template(&data, path)
}

pub fn load_roster_from(path: &Path) -> Result<Vec<Team>, BracketError> {
  let data = fs::read_to_string(path).map_err(|e| BracketError::io(path, e))?;
  serde_json::from_str::<Vec<Team>>(&data).map_err(|e| BracketError::parse(path, e))
}
