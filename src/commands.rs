use crate::bracket::Bracket;
use crate::config::resolve_repo_path;
use crate::store::{delete_snapshot, load_snapshot, save_snapshot};
use crate::template::{load_roster_from, load_template_from};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Lock the session, then call `f` with the loaded bracket.
fn with_bracket<F, R>(session: &SharedBracket, f: F) -> Result<R, String>
where
    F: FnOnce(&mut Bracket) -> Result<R, String>,
{
    with_session(session, |guard| {
        let bracket = guard
            .bracket
            .as_mut()
            .ok_or_else(|| "No bracket loaded.".to_string())?;
        f(bracket)
    })
}

/// Lock the session, then call `f` with the whole session, for commands that
/// replace or drop the bracket.
fn with_session<F, R>(session: &SharedBracket, f: F) -> Result<R, String>
where
    F: FnOnce(&mut BracketSession) -> Result<R, String>,
{
    let mut guard = session.lock().map_err(|e| e.to_string())?;
    f(&mut guard)
}

/// Same as `with_bracket`, then writes the snapshot once the rebuild is done.
fn with_bracket_persisted<F, R>(session: &SharedBracket, f: F) -> Result<R, String>
where
    F: FnOnce(&mut Bracket) -> Result<R, String>,
{
    with_session(session, |guard| {
        let bracket = guard
            .bracket
            .as_mut()
            .ok_or_else(|| "No bracket loaded.".to_string())?;
        let result = f(bracket)?;
        persist(guard)?;
        Ok(result)
    })
}

fn persist(guard: &BracketSession) -> Result<(), String> {
    let (Some(bracket), Some(path)) = (guard.bracket.as_ref(), guard.state_path.as_ref()) else {
        return Ok(());
    };
    let mut snapshot = bracket.snapshot();
    snapshot.draws = guard.draws;
    save_snapshot(path, &snapshot).map_err(|e| e.to_string())
}

fn draw_into(guard: &mut BracketSession) -> Result<DrawReport, String> {
    let seed = guard.draw_seed.map(|seed| seed.wrapping_add(guard.draws));
    let bracket = guard
        .bracket
        .as_mut()
        .ok_or_else(|| "No bracket loaded.".to_string())?;
    let report = match seed {
        Some(seed) => bracket.run_draw(&mut StdRng::seed_from_u64(seed)),
        None => bracket.run_draw(&mut rand::thread_rng()),
    };
    guard.draws += 1;
    Ok(report)
}

// ── Commands ────────────────────────────────────────────────────────────

/// Restore the saved bracket if there is one, otherwise build it from the
/// template and roster and draw any random bands. A saved draw is reused.
pub fn bracket_load(session: &SharedBracket, config: &EngineConfig) -> Result<ResolvedView, String> {
    with_session(session, |guard| {
        let state_path = resolve_repo_path(&config.state_path);
        guard.state_path = Some(state_path.clone());
        guard.draw_seed = config.draw_seed;

        let bracket = match load_snapshot(&state_path).map_err(|e| e.to_string())? {
            Some(snapshot) => {
                info!(
                    "restoring bracket from {} ({} draw(s) so far)",
                    state_path.display(),
                    snapshot.draws
                );
                guard.draws = snapshot.draws;
                Bracket::from_snapshot(snapshot).map_err(|e| e.to_string())?
            }
            None => {
                guard.draws = 0;
                let template_path = resolve_repo_path(&config.template_path);
                let roster_path = resolve_repo_path(&config.roster_path);
                let template = load_template_from(&template_path).map_err(|e| e.to_string())?;
                let roster = load_roster_from(&roster_path).map_err(|e| e.to_string())?;
                Bracket::new(template, roster).map_err(|e| e.to_string())?
            }
        };
        let needs_draw = bracket.needs_draw();
        guard.bracket = Some(bracket);

        if needs_draw || config.reroll_on_start {
            draw_into(guard)?;
        }
        persist(guard)?;
        let bracket = guard
            .bracket
            .as_ref()
            .ok_or_else(|| "Bracket failed to load.".to_string())?;
        Ok(bracket.view().clone())
    })
}

pub fn bracket_state(session: &SharedBracket) -> Result<ResolvedView, String> {
    with_bracket(session, |bracket| Ok(bracket.view().clone()))
}

/// Matches ready to be put on a court, in bracket order.
pub fn bracket_ready_matches(session: &SharedBracket) -> Result<Vec<MatchId>, String> {
    with_bracket(session, |bracket| Ok(bracket.ready_matches()))
}

/// Run the draw, or reroll it; previous bindings are discarded.
pub fn bracket_run_draw(session: &SharedBracket) -> Result<DrawReport, String> {
    with_session(session, |guard| {
        let report = draw_into(guard)?;
        persist(guard)?;
        Ok(report)
    })
}

pub fn bracket_record_score(
    session: &SharedBracket,
    match_id: MatchId,
    score1: u32,
    score2: u32,
) -> Result<ScoreUpdate, String> {
    with_bracket_persisted(session, |bracket| {
        bracket
            .record_score(match_id, score1, score2)
            .map_err(|e| e.to_string())
    })
}

pub fn bracket_reset_score(session: &SharedBracket, match_id: MatchId) -> Result<ScoreUpdate, String> {
    with_bracket_persisted(session, |bracket| {
        bracket.reset_score(match_id).map_err(|e| e.to_string())
    })
}

pub fn bracket_set_roster(session: &SharedBracket, roster: Vec<Team>) -> Result<ResolvedView, String> {
    with_bracket_persisted(session, |bracket| {
        bracket.set_roster(roster);
        Ok(bracket.view().clone())
    })
}

/// Drop all match state, e.g. when the format is unselected and teams are
/// unlocked.
pub fn bracket_clear(session: &SharedBracket) -> Result<(), String> {
    with_session(session, |guard| {
        guard.bracket = None;
        guard.draws = 0;
        if let Some(path) = guard.state_path.as_ref() {
            delete_snapshot(path).map_err(|e| e.to_string())?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const TEMPLATE: &str = r#"{
        "name": "Club Night",
        "phases": [
            {
                "name": "Semi-finals",
                "matches": [
                    { "id": 1, "order": 1, "slot1": "TS1", "slot2": "random_3_4" },
                    { "id": 2, "order": 2, "slot1": "TS2", "slot2": "random_3_4" }
                ]
            },
            {
                "name": "Final",
                "matches": [
                    { "id": 3, "order": 3, "slot1": "W_1", "slot2": "W_2" }
                ]
            }
        ]
    }"#;

    const ROSTER: &str = r#"[
        { "id": 11, "seedNumber": 1, "name": "North" },
        { "id": 12, "seedNumber": 2, "name": "South" },
        { "id": 13, "seedNumber": 3, "name": "East" },
        { "id": 14, "seedNumber": 4, "name": "West" }
    ]"#;

    fn make_config(dir: &Path) -> EngineConfig {
        fs::write(dir.join("template.json"), TEMPLATE).unwrap();
        fs::write(dir.join("roster.json"), ROSTER).unwrap();
        EngineConfig {
            template_path: dir.join("template.json").to_string_lossy().to_string(),
            roster_path: dir.join("roster.json").to_string_lossy().to_string(),
            state_path: dir.join("state.json").to_string_lossy().to_string(),
            draw_seed: Some(21),
            ..EngineConfig::default()
        }
    }

    fn make_session() -> SharedBracket {
        Arc::new(Mutex::new(BracketSession::default()))
    }

    #[test]
    fn test_load_draws_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let session = make_session();

        let view = bracket_load(&session, &config).unwrap();
        assert!(dir.path().join("state.json").is_file());
        assert_eq!(view.get(1).map(|m| m.state), Some(MatchState::Ready));
        assert_eq!(view.get(2).map(|m| m.state), Some(MatchState::Ready));
        assert_eq!(bracket_ready_matches(&session).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_reload_reuses_saved_draw() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = make_config(dir.path());
        let first = bracket_load(&make_session(), &config).unwrap();

        config.draw_seed = Some(99);
        let second = bracket_load(&make_session(), &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reroll_after_reload_moves_to_next_seed() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let state_path = dir.path().join("state.json");
        bracket_load(&make_session(), &config).unwrap();
        let saved = load_snapshot(&state_path).unwrap().unwrap();
        assert_eq!(saved.draws, 1);

        let mut expected = Bracket::from_snapshot(saved).unwrap();
        expected.run_draw(&mut StdRng::seed_from_u64(22));

        let session = make_session();
        bracket_load(&session, &config).unwrap();
        bracket_run_draw(&session).unwrap();
        let rerolled = load_snapshot(&state_path).unwrap().unwrap();
        assert_eq!(rerolled.draws, 2);
        assert_eq!(&rerolled.bindings, expected.bindings());
    }

    #[test]
    fn test_record_score_persists_delta() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let session = make_session();
        bracket_load(&session, &config).unwrap();

        let update = bracket_record_score(&session, 1, 5, 2).unwrap();
        assert_eq!(update.changed, vec![3]);
        let saved = load_snapshot(&dir.path().join("state.json")).unwrap().unwrap();
        assert_eq!(saved.matches[0].score1, Some(5));

        let err = bracket_record_score(&session, 3, 1, 0).unwrap_err();
        assert!(err.contains("entrants not yet determined"));

        bracket_reset_score(&session, 1).unwrap();
        let view = bracket_state(&session).unwrap();
        assert_eq!(view.get(3).map(|m| m.team_ids()), Some([None, None]));
    }

    #[test]
    fn test_clear_removes_bracket_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let session = make_session();
        bracket_load(&session, &config).unwrap();
        bracket_clear(&session).unwrap();
        assert!(!dir.path().join("state.json").is_file());
        assert!(bracket_state(&session).is_err());
    }

    #[test]
    fn test_reroll_keeps_band_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let session = make_session();
        bracket_load(&session, &config).unwrap();
        let report = bracket_run_draw(&session).unwrap();
        assert_eq!(report.unbound_total(), 0);
        let view = bracket_state(&session).unwrap();
        let a = view.get(1).and_then(|m| m.slots[1].team_id);
        let b = view.get(2).and_then(|m| m.slots[1].team_id);
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
    }
}
