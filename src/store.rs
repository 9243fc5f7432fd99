use chrono::Local;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::error::BracketError;
use crate::types::{DrawBinding, MatchSpec, Team};

/// Everything needed to rebuild a bracket after a reload, including the draw
/// so it is reused rather than re-randomized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSnapshot {
  #[serde(default)]
  pub name: String,
  pub matches: Vec<MatchSpec>,
  #[serde(default)]
  pub bindings: DrawBinding,
  #[serde(default)]
  pub roster: Vec<Team>,
  /// Draws run so far, so a seeded reroll after a reload moves on to the
  /// next seed.
  #[serde(default)]
  pub draws: u64,
  #[serde(default)]
  pub saved_at: String,
}

impl BracketSnapshot {
  pub fn new(name: String, matches: Vec<MatchSpec>, bindings: DrawBinding, roster: Vec<Team>) -> Self {
    BracketSnapshot {
      name,
      matches,
      bindings,
      roster,
      draws: 0,
      saved_at: Local::now().to_rfc3339(),
    }
  }
}

pub fn save_snapshot(path: &Path, snapshot: &BracketSnapshot) -> Result<(), BracketError> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent).map_err(|e| BracketError::io(parent, e))?;
    }
  }
  let payload = serde_json::to_string_pretty(snapshot).map_err(|e| BracketError::parse(path, e))?;
  fs::write(path, payload).map_err(|e| BracketError::io(path, e))?;
  info!("saved bracket snapshot to {}", path.display());
  Ok(())
}

/// `Ok(None)` when nothing has been saved yet.
pub fn load_snapshot(path: &Path) -> Result<Option<BracketSnapshot>, BracketError> {
  if !path.is_file() {
    return Ok(None);
  }
  let data = fs::read_to_string(path).map_err(|e| BracketError::io(path, e))?;
  let snapshot =
    serde_json::from_str::<BracketSnapshot>(&data).map_err(|e| BracketError::parse(path, e))?;
  Ok(Some(snapshot))
}

pub fn delete_snapshot(path: &Path) -> Result<(), BracketError> {
  if !path.is_file() {
    return Ok(());
  }
  fs::remove_file(path).map_err(|e| BracketError::io(path, e))?;
  info!("deleted bracket snapshot {}", path.display());
  Ok(())
}
