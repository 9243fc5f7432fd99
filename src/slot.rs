use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::types::{Band, MatchId, MatchSpec};

/// A raw slot string classified by [`parse_slot`]. Bare random bands carry no
/// occurrence yet; [`index_occurrences`] assigns one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotSpecifier {
  Seed(u32),
  RandomBand { band: Band, occurrence: Option<u32> },
  WinnerOf(MatchId),
  LoserOf(MatchId),
  Unresolved(String),
}

/// A slot reference with every random band pinned to an occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotReference {
  Seed(u32),
  RandomBand { band: Band, occurrence: u32 },
  WinnerOf(MatchId),
  LoserOf(MatchId),
  Unresolved(String),
}

impl SlotReference {
  /// The match this slot waits on, if any.
  pub fn depends_on(&self) -> Option<MatchId> {
    match self {
      SlotReference::WinnerOf(id) | SlotReference::LoserOf(id) => Some(*id),
      _ => None,
    }
  }

  /// Placeholder shown while the slot has no team.
  pub fn label(&self) -> String {
    match self {
      SlotReference::Seed(seed) => format!("Seed {seed}"),
      SlotReference::RandomBand { band, occurrence } => format!("Random {band} #{occurrence}"),
      SlotReference::WinnerOf(id) => format!("Winner of #{id}"),
      SlotReference::LoserOf(id) => format!("Loser of #{id}"),
      SlotReference::Unresolved(raw) => raw.clone(),
    }
  }
}

pub fn parse_slot(raw: &str) -> SlotSpecifier {
  let trimmed = raw.trim();
  if let Some(seed) = parse_number::<u32>(trimmed) {
    return SlotSpecifier::Seed(seed);
  }
  if let Some(seed) = trimmed.strip_prefix("TS").and_then(parse_number::<u32>) {
    return SlotSpecifier::Seed(seed);
  }
  if let Some(spec) = trimmed.strip_prefix("random_").and_then(parse_band) {
    return spec;
  }
  for prefix in ["winner_", "W_"] {
    if let Some(id) = trimmed.strip_prefix(prefix).and_then(parse_number::<MatchId>) {
      return SlotSpecifier::WinnerOf(id);
    }
  }
  for prefix in ["loser_", "L_"] {
    if let Some(id) = trimmed.strip_prefix(prefix).and_then(parse_number::<MatchId>) {
      return SlotSpecifier::LoserOf(id);
    }
  }
  SlotSpecifier::Unresolved(raw.to_string())
}

fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
  if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  raw.parse().ok()
}

fn parse_band(rest: &str) -> Option<SlotSpecifier> {
  let parts = rest.split('_').collect::<Vec<_>>();
  let (min, max, occurrence) = match parts.as_slice() {
    [min, max] => (parse_number::<u32>(min)?, parse_number::<u32>(max)?, None),
    [min, max, k] => (
      parse_number::<u32>(min)?,
      parse_number::<u32>(max)?,
      Some(parse_number::<u32>(k)?),
    ),
    _ => return None,
  };
  if min > max || occurrence == Some(0) {
    return None;
  }
  Some(SlotSpecifier::RandomBand {
    band: Band::new(min, max),
    occurrence,
  })
}

/// Positions of `matches` in ascending `order`, ties broken by id.
pub fn traversal_order(matches: &[MatchSpec]) -> Vec<usize> {
  let mut positions = (0..matches.len()).collect::<Vec<_>>();
  positions.sort_by_key(|idx| (matches[*idx].order, matches[*idx].id));
  positions
}

/// Parses both slots of every match and numbers bare random-band occurrences
/// per band, walking matches by `order` and slot1 before slot2. The result is
/// aligned with `matches`.
pub fn index_occurrences(matches: &[MatchSpec]) -> Vec<[SlotReference; 2]> {
  let mut counters: BTreeMap<Band, u32> = BTreeMap::new();
  let mut indexed: Vec<Option<[SlotReference; 2]>> = vec![None; matches.len()];

  for idx in traversal_order(matches) {
    let [raw1, raw2] = matches[idx].raw_slots();
    let first = pin_occurrence(parse_slot(raw1), &mut counters);
    let second = pin_occurrence(parse_slot(raw2), &mut counters);
    indexed[idx] = Some([first, second]);
  }

  indexed
    .into_iter()
    .map(|slots| {
      slots.unwrap_or_else(|| {
        [
          SlotReference::Unresolved(String::new()),
          SlotReference::Unresolved(String::new()),
        ]
      })
    })
    .collect()
}

fn pin_occurrence(spec: SlotSpecifier, counters: &mut BTreeMap<Band, u32>) -> SlotReference {
  match spec {
    SlotSpecifier::Seed(seed) => SlotReference::Seed(seed),
    SlotSpecifier::RandomBand { band, occurrence: Some(occurrence) } => {
      SlotReference::RandomBand { band, occurrence }
    }
    SlotSpecifier::RandomBand { band, occurrence: None } => {
      let counter = counters.entry(band).or_insert(0);
      *counter += 1;
      SlotReference::RandomBand { band, occurrence: *counter }
    }
    SlotSpecifier::WinnerOf(id) => SlotReference::WinnerOf(id),
    SlotSpecifier::LoserOf(id) => SlotReference::LoserOf(id),
    SlotSpecifier::Unresolved(raw) => SlotReference::Unresolved(raw),
  }
}

/// Every band referenced by the template with its distinct occurrence indices.
pub fn band_occurrences(slots: &[[SlotReference; 2]]) -> BTreeMap<Band, BTreeSet<u32>> {
  let mut bands: BTreeMap<Band, BTreeSet<u32>> = BTreeMap::new();
  for reference in slots.iter().flatten() {
    if let SlotReference::RandomBand { band, occurrence } = reference {
      bands.entry(*band).or_default().insert(*occurrence);
    }
  }
  bands
}
