use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

use crate::draw::draw_with_rng;
use crate::error::BracketError;
use crate::resolver::{changed_matches, resolve_all};
use crate::slot::{band_occurrences, index_occurrences, traversal_order, SlotReference};
use crate::store::BracketSnapshot;
use crate::template::{validate_matches, BracketTemplate};
use crate::types::{
  Band, DrawBinding, DrawReport, MatchId, MatchSpec, MatchState, ResolvedMatch, ResolvedView,
  ScoreUpdate, Team, WinnerSlot,
};

/// A tournament's matches held as an arena indexed by id, together with the
/// roster, the current draw, and the resolved view derived from them.
///
/// Every mutation rebuilds the resolved view from scratch in `order`, which
/// is how a recorded result reaches all of its dependents.
pub struct Bracket {
  name: String,
  matches: Vec<MatchSpec>,
  match_index: HashMap<MatchId, usize>,
  slots: Vec<[SlotReference; 2]>,
  roster: Vec<Team>,
  bindings: DrawBinding,
  view: ResolvedView,
}

impl Bracket {
  pub fn new(template: BracketTemplate, roster: Vec<Team>) -> Result<Self, BracketError> {
    let name = template.name.clone();
    Bracket::from_parts(name, template.into_matches(), roster, DrawBinding::new())
  }

  pub fn from_parts(
    name: String,
    matches: Vec<MatchSpec>,
    roster: Vec<Team>,
    bindings: DrawBinding,
  ) -> Result<Self, BracketError> {
    validate_matches(&matches)?;
    let matches = traversal_order(&matches)
      .into_iter()
      .map(|idx| matches[idx].clone())
      .collect::<Vec<_>>();
    let match_index = matches
      .iter()
      .enumerate()
      .map(|(idx, m)| (m.id, idx))
      .collect::<HashMap<_, _>>();
    let slots = index_occurrences(&matches);

    let mut bracket = Bracket {
      name,
      matches,
      match_index,
      slots,
      roster,
      bindings,
      view: ResolvedView::default(),
    };
    bracket.rebuild();
    info!(
      "bracket '{}' loaded: {} match(es), {} random band(s)",
      bracket.name,
      bracket.matches.len(),
      bracket.random_bands().len()
    );
    Ok(bracket)
  }

  pub fn from_snapshot(snapshot: BracketSnapshot) -> Result<Self, BracketError> {
    Bracket::from_parts(snapshot.name, snapshot.matches, snapshot.roster, snapshot.bindings)
  }

  pub fn snapshot(&self) -> BracketSnapshot {
    BracketSnapshot::new(
      self.name.clone(),
      self.matches.clone(),
      self.bindings.clone(),
      self.roster.clone(),
    )
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Matches in ascending `order`.
  pub fn matches(&self) -> &[MatchSpec] {
    &self.matches
  }

  pub fn roster(&self) -> &[Team] {
    &self.roster
  }

  pub fn bindings(&self) -> &DrawBinding {
    &self.bindings
  }

  pub fn view(&self) -> &ResolvedView {
    &self.view
  }

  pub fn get_match(&self, match_id: MatchId) -> Option<&MatchSpec> {
    self.match_index.get(&match_id).and_then(|idx| self.matches.get(*idx))
  }

  pub fn resolved(&self, match_id: MatchId) -> Option<&ResolvedMatch> {
    self.match_index.get(&match_id).and_then(|idx| self.view.matches.get(*idx))
  }

  pub fn slot_references(&self, match_id: MatchId) -> Option<&[SlotReference; 2]> {
    self.match_index.get(&match_id).and_then(|idx| self.slots.get(*idx))
  }

  pub fn random_bands(&self) -> BTreeMap<Band, BTreeSet<u32>> {
    band_occurrences(&self.slots)
  }

  /// True when the template draws from a band and no draw is on record.
  pub fn needs_draw(&self) -> bool {
    self.bindings.is_empty() && !self.random_bands().is_empty()
  }

  /// Draws every band afresh, discarding the previous bindings entirely.
  pub fn run_draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DrawReport {
    let (bindings, report) = draw_with_rng(&self.random_bands(), &self.roster, rng);
    self.bindings = bindings;
    self.rebuild();
    report
  }

  pub fn set_roster(&mut self, roster: Vec<Team>) {
    self.roster = roster;
    self.rebuild();
  }

  pub fn rebuild(&mut self) {
    self.view = resolve_all(&self.matches, &self.slots, &self.roster, &self.bindings);
  }

  /// Records a score and propagates the result. Rejected while either entrant
  /// is unknown. A tie stores the score without deciding the match.
  pub fn record_score(
    &mut self,
    match_id: MatchId,
    score1: u32,
    score2: u32,
  ) -> Result<ScoreUpdate, BracketError> {
    let index = self.index_of(match_id)?;
    let resolved = &self.view.matches[index];
    if resolved.team_ids().iter().any(|id| id.is_none()) {
      return Err(BracketError::EntrantsNotDetermined(match_id));
    }

    let winner_slot = WinnerSlot::from_scores(score1, score2);
    {
      let spec = &mut self.matches[index];
      spec.score1 = Some(score1);
      spec.score2 = Some(score2);
      spec.winner_slot = winner_slot;
    }
    info!("match {match_id}: recorded {score1}-{score2} ({winner_slot:?})");
    Ok(self.rebuild_with_changes(index))
  }

  /// Clears a match's score and rebuilds. Matches further on that were
  /// already decided keep their own scores.
  pub fn reset_score(&mut self, match_id: MatchId) -> Result<ScoreUpdate, BracketError> {
    let index = self.index_of(match_id)?;
    self.matches[index].clear_score();
    info!("match {match_id}: score reset");
    Ok(self.rebuild_with_changes(index))
  }

  fn rebuild_with_changes(&mut self, index: usize) -> ScoreUpdate {
    let before = std::mem::take(&mut self.view);
    self.rebuild();
    let changed = changed_matches(&before, &self.view);
    if !changed.is_empty() {
      debug!("re-resolved match(es) {changed:?}");
    }
    ScoreUpdate {
      match_spec: self.matches[index].clone(),
      changed,
    }
  }

  fn index_of(&self, match_id: MatchId) -> Result<usize, BracketError> {
    self
      .match_index
      .get(&match_id)
      .copied()
      .ok_or(BracketError::MatchNotFound(match_id))
  }

  /// Matches with both entrants known and no winner yet, in `order`. A tied
  /// match stays on this list until it is replayed.
  pub fn ready_matches(&self) -> Vec<MatchId> {
    self
      .view
      .matches
      .iter()
      .filter(|m| m.state == MatchState::Ready)
      .map(|m| m.id)
      .collect()
  }

  pub fn decided_count(&self) -> usize {
    self
      .view
      .matches
      .iter()
      .filter(|m| m.state == MatchState::Decided)
      .count()
  }

  pub fn is_complete(&self) -> bool {
    self.decided_count() == self.matches.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  fn make_roster() -> Vec<Team> {
    (1..=8)
      .map(|seed| Team::new(seed * 10, Some(seed), format!("Team {seed}")))
      .collect()
  }

  /// Eight-team single elimination: quarter-finals by seed, semis, a
  /// third-place match and a final.
  fn make_bracket() -> Bracket {
    let matches = vec![
      MatchSpec::new(5, 10, "1", "8"),
      MatchSpec::new(6, 11, "TS4", "TS5"),
      MatchSpec::new(7, 12, "2", "7"),
      MatchSpec::new(8, 13, "3", "6"),
      MatchSpec::new(12, 20, "winner_5", "W_6"),
      MatchSpec::new(13, 21, "W_7", "W_8"),
      MatchSpec::new(14, 30, "L_12", "loser_13"),
      MatchSpec::new(15, 31, "W_12", "W_13"),
    ];
    Bracket::from_parts("Cup".to_string(), matches, make_roster(), DrawBinding::new()).unwrap()
  }

  fn team_in(bracket: &Bracket, match_id: MatchId, slot: usize) -> Option<u32> {
    bracket.resolved(match_id).and_then(|m| m.slots[slot].team_id)
  }

  #[test]
  fn test_winner_propagates_to_dependent_match() {
    let mut bracket = make_bracket();
    let update = bracket.record_score(5, 6, 3).unwrap();
    assert_eq!(update.match_spec.winner_slot, WinnerSlot::Slot1);
    assert_eq!(update.changed, vec![12]);
    assert_eq!(team_in(&bracket, 12, 0), Some(10));
    assert_eq!(bracket.resolved(5).map(|m| m.state), Some(MatchState::Decided));
  }

  #[test]
  fn test_loser_propagates_to_other_team() {
    let mut bracket = make_bracket();
    bracket.record_score(5, 1, 4).unwrap();
    bracket.record_score(6, 2, 0).unwrap();
    bracket.record_score(12, 0, 3).unwrap();
    assert_eq!(team_in(&bracket, 12, 0), Some(80));
    assert_eq!(team_in(&bracket, 12, 1), Some(40));
    assert_eq!(team_in(&bracket, 15, 0), Some(40));
    assert_eq!(team_in(&bracket, 14, 0), Some(80));
  }

  #[test]
  fn test_tie_changes_no_dependent() {
    let mut bracket = make_bracket();
    let before = bracket.view().clone();
    let update = bracket.record_score(5, 2, 2).unwrap();
    assert_eq!(update.match_spec.winner_slot, WinnerSlot::None);
    assert_eq!(update.match_spec.score1, Some(2));
    assert!(update.changed.is_empty());
    assert_eq!(team_in(&bracket, 12, 0), None);
    assert_eq!(before.get(12), bracket.view().get(12));
  }

  #[test]
  fn test_unresolved_entrants_reject_score() {
    let mut bracket = make_bracket();
    assert_eq!(
      bracket.record_score(12, 1, 0).unwrap_err(),
      BracketError::EntrantsNotDetermined(12)
    );
    assert_eq!(bracket.record_score(99, 1, 0).unwrap_err(), BracketError::MatchNotFound(99));
  }

  #[test]
  fn test_reset_keeps_downstream_scores() {
    let mut bracket = make_bracket();
    bracket.record_score(5, 6, 3).unwrap();
    bracket.record_score(6, 2, 1).unwrap();
    bracket.record_score(12, 3, 1).unwrap();

    let update = bracket.reset_score(5).unwrap();
    assert_eq!(update.match_spec.winner_slot, WinnerSlot::None);
    assert_eq!(update.match_spec.score1, None);
    assert!(update.changed.contains(&12));

    let downstream = bracket.get_match(12).unwrap();
    assert_eq!(downstream.score1, Some(3));
    assert_eq!(downstream.winner_slot, WinnerSlot::Slot1);
    assert_eq!(team_in(&bracket, 12, 0), None);
    assert_eq!(bracket.resolved(12).map(|m| m.state), Some(MatchState::Unresolved));
    assert_eq!(team_in(&bracket, 15, 0), None);
  }

  #[test]
  fn test_rerecording_after_reset_restores_propagation() {
    let mut bracket = make_bracket();
    bracket.record_score(5, 6, 3).unwrap();
    bracket.reset_score(5).unwrap();
    bracket.record_score(5, 0, 2).unwrap();
    assert_eq!(team_in(&bracket, 12, 0), Some(80));
  }

  #[test]
  fn test_ready_matches_and_completion() {
    let mut bracket = make_bracket();
    assert_eq!(bracket.ready_matches(), vec![5, 6, 7, 8]);
    bracket.record_score(5, 1, 0).unwrap();
    bracket.record_score(6, 1, 0).unwrap();
    assert_eq!(bracket.ready_matches(), vec![7, 8, 12]);

    bracket.record_score(7, 1, 1).unwrap();
    assert_eq!(bracket.resolved(7).map(|m| m.state), Some(MatchState::Ready));
    assert_eq!(bracket.ready_matches(), vec![7, 8, 12]);

    for (id, a, b) in [(7, 2, 0), (8, 0, 2), (12, 3, 2), (13, 1, 3), (14, 5, 4), (15, 2, 1)] {
      bracket.record_score(id, a, b).unwrap();
    }
    assert!(bracket.is_complete());
    assert!(bracket.ready_matches().is_empty());
  }

  #[test]
  fn test_random_bands_drawn_exclusively() {
    let matches = vec![
      MatchSpec::new(1, 1, "1", "random_5_8"),
      MatchSpec::new(2, 2, "2", "random_5_8"),
      MatchSpec::new(3, 3, "3", "random_5_8"),
      MatchSpec::new(4, 4, "4", "random_5_8"),
    ];
    let mut bracket =
      Bracket::from_parts(String::new(), matches, make_roster(), DrawBinding::new()).unwrap();
    assert!(bracket.needs_draw());
    assert_eq!(bracket.ready_matches(), Vec::<MatchId>::new());

    let report = bracket.run_draw(&mut StdRng::seed_from_u64(11));
    assert_eq!(report.unbound_total(), 0);
    assert!(!bracket.needs_draw());
    let opponents = [1, 2, 3, 4]
      .iter()
      .filter_map(|id| team_in(&bracket, *id, 1))
      .collect::<HashSet<_>>();
    assert_eq!(opponents.len(), 4);
    assert_eq!(bracket.ready_matches(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn test_reroll_replaces_bindings() {
    let matches = vec![
      MatchSpec::new(1, 1, "random_1_8", "random_1_8"),
      MatchSpec::new(2, 2, "random_1_8", "random_1_8"),
    ];
    let mut bracket =
      Bracket::from_parts(String::new(), matches, make_roster(), DrawBinding::new()).unwrap();
    bracket.run_draw(&mut StdRng::seed_from_u64(1));
    let first = bracket.bindings().clone();
    bracket.run_draw(&mut StdRng::seed_from_u64(2));
    assert_eq!(bracket.bindings().len(), 4);
    let mut again = StdRng::seed_from_u64(2);
    let (expected, _) = draw_with_rng(&bracket.random_bands(), bracket.roster(), &mut again);
    assert_eq!(bracket.bindings(), &expected);
    assert_eq!(first.len(), 4);
  }

  #[test]
  fn test_roster_change_drops_missing_teams() {
    let matches = vec![MatchSpec::new(1, 1, "1", "random_2_3")];
    let mut bracket =
      Bracket::from_parts(String::new(), matches, make_roster(), DrawBinding::new()).unwrap();
    bracket.run_draw(&mut StdRng::seed_from_u64(5));
    let drawn = team_in(&bracket, 1, 1).unwrap();
    let roster = make_roster().into_iter().filter(|t| t.id != drawn).collect();
    bracket.set_roster(roster);
    assert_eq!(team_in(&bracket, 1, 1), None);
    assert_eq!(team_in(&bracket, 1, 0), Some(10));
  }

  #[test]
  fn test_matches_sorted_by_order() {
    let matches = vec![
      MatchSpec::new(2, 20, "W_1", "3"),
      MatchSpec::new(1, 10, "1", "2"),
    ];
    let bracket =
      Bracket::from_parts(String::new(), matches, make_roster(), DrawBinding::new()).unwrap();
    assert_eq!(bracket.matches().iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(
      bracket.slot_references(2).map(|s| s[0].clone()),
      Some(SlotReference::WinnerOf(1))
    );
  }
}
