use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::types::{Band, BandDrawReport, DrawBinding, DrawReport, Team};

/// Draws every band with the thread RNG. See [`draw_with_rng`].
pub fn draw(bands: &BTreeMap<Band, BTreeSet<u32>>, roster: &[Team]) -> (DrawBinding, DrawReport) {
  draw_with_rng(bands, roster, &mut rand::thread_rng())
}

/// Fresh draw for all bands. Each band's candidates (teams whose seed lies in
/// the band) are shuffled and handed out to the band's occurrences in
/// ascending order. Occurrences left over once candidates run out stay
/// unbound and are listed in the report.
pub fn draw_with_rng<R: Rng + ?Sized>(
  bands: &BTreeMap<Band, BTreeSet<u32>>,
  roster: &[Team],
  rng: &mut R,
) -> (DrawBinding, DrawReport) {
  let mut binding = DrawBinding::new();
  let mut report = DrawReport::default();

  for (band, occurrences) in bands {
    let mut candidates = band_candidates(*band, roster);
    let candidate_count = candidates.len();
    candidates.shuffle(rng);

    let mut bound = 0usize;
    let mut unbound = Vec::new();
    let mut pool = candidates.into_iter();
    for occurrence in occurrences.iter().copied() {
      match pool.next() {
        Some(team_id) if binding.bind(*band, occurrence, team_id) => bound += 1,
        _ => unbound.push(occurrence),
      }
    }

    if unbound.is_empty() {
      debug!("band {band}: bound {bound} of {candidate_count} candidates");
    } else {
      warn!(
        "band {band}: {} occurrence(s) left unbound, only {candidate_count} candidate(s)",
        unbound.len()
      );
    }
    report.bands.push(BandDrawReport {
      band: *band,
      candidates: candidate_count,
      bound,
      unbound,
    });
  }

  info!(
    "draw complete: {} band(s), {} binding(s), {} unbound",
    report.bands.len(),
    binding.len(),
    report.unbound_total()
  );
  (binding, report)
}

/// Team ids seeded inside `band`, in seed order so the shuffle input does not
/// depend on roster order.
fn band_candidates(band: Band, roster: &[Team]) -> Vec<u32> {
  let mut seeded = roster
    .iter()
    .filter_map(|team| {
      let seed = team.seed_number?;
      band.contains(seed).then_some((seed, team.id))
    })
    .collect::<Vec<_>>();
  seeded.sort_unstable();
  seeded.dedup_by_key(|(_, id)| *id);
  seeded.into_iter().map(|(_, id)| id).collect()
}
