use std::collections::BTreeMap;
use tracing::debug;

use crate::slot::SlotReference;
use crate::types::{
  DrawBinding, MatchId, MatchOutcome, MatchSpec, MatchState, ResolvedMatch, ResolvedSlot,
  ResolvedView, Team, TeamId,
};

pub type OutcomeMap = BTreeMap<MatchId, MatchOutcome>;

/// Concrete team for one slot, or `None` while the slot is undetermined.
pub fn resolve<'a>(
  reference: &SlotReference,
  roster: &'a [Team],
  bindings: &DrawBinding,
  outcomes: &OutcomeMap,
) -> Option<&'a Team> {
  match reference {
    SlotReference::Seed(seed) => roster.iter().find(|team| team.seed_number == Some(*seed)),
    SlotReference::RandomBand { band, occurrence } => {
      let team_id = bindings.get(*band, *occurrence)?;
      find_team(roster, team_id)
    }
    SlotReference::WinnerOf(match_id) => {
      let team_id = outcomes.get(match_id)?.winner_team_id?;
      find_team(roster, team_id)
    }
    SlotReference::LoserOf(match_id) => {
      let team_id = outcomes.get(match_id)?.loser_team_id?;
      find_team(roster, team_id)
    }
    SlotReference::Unresolved(_) => None,
  }
}

fn find_team(roster: &[Team], team_id: TeamId) -> Option<&Team> {
  roster.iter().find(|team| team.id == team_id)
}

/// Full rebuild of the resolved view in one pass over `matches`, which must
/// be sorted by ascending `order` with `slots` aligned to them. A decided
/// match only yields an outcome once both of its own slots resolve, so later
/// matches see winners and losers of every earlier one.
pub fn resolve_all(
  matches: &[MatchSpec],
  slots: &[[SlotReference; 2]],
  roster: &[Team],
  bindings: &DrawBinding,
) -> ResolvedView {
  debug_assert_eq!(matches.len(), slots.len());
  debug_assert!(matches.windows(2).all(|pair| pair[0].order < pair[1].order));

  let mut outcomes = OutcomeMap::new();
  let mut resolved = Vec::with_capacity(matches.len());

  for (spec, references) in matches.iter().zip(slots) {
    let teams = [
      resolve(&references[0], roster, bindings, &outcomes),
      resolve(&references[1], roster, bindings, &outcomes),
    ];

    let state = match (teams[0], teams[1], spec.winner_slot.index()) {
      (Some(first), Some(second), Some(winner)) => {
        let ids = [first.id, second.id];
        outcomes.insert(
          spec.id,
          MatchOutcome {
            match_id: spec.id,
            winner_team_id: Some(ids[winner]),
            loser_team_id: Some(ids[1 - winner]),
          },
        );
        MatchState::Decided
      }
      (Some(_), Some(_), None) => MatchState::Ready,
      _ => MatchState::Unresolved,
    };

    let slot_views = [
      resolved_slot(&references[0], teams[0]),
      resolved_slot(&references[1], teams[1]),
    ];
    resolved.push(ResolvedMatch {
      id: spec.id,
      order: spec.order,
      phase: spec.phase.clone(),
      slots: slot_views,
      score1: spec.score1,
      score2: spec.score2,
      winner_slot: spec.winner_slot,
      state,
    });
  }

  debug!(
    "rebuilt {} match(es), {} decided",
    resolved.len(),
    outcomes.len()
  );
  ResolvedView {
    matches: resolved,
    outcomes,
  }
}

fn resolved_slot(reference: &SlotReference, team: Option<&Team>) -> ResolvedSlot {
  ResolvedSlot {
    team_id: team.map(|t| t.id),
    team_name: team.map(|t| t.name.clone()),
    label: reference.label(),
  }
}

/// Ids of matches whose resolved teams differ between two views of the same
/// bracket.
pub fn changed_matches(before: &ResolvedView, after: &ResolvedView) -> Vec<MatchId> {
  after
    .matches
    .iter()
    .filter(|current| {
      before
        .get(current.id)
        .map(|previous| previous.team_ids() != current.team_ids())
        .unwrap_or(true)
    })
    .map(|current| current.id)
    .collect()
}
