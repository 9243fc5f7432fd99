use crate::types::*;
use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw.trim());
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  repo_root().join(CONFIG_FILE_NAME)
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

fn parse_flag(value: &str) -> bool {
  let value = value.trim().to_ascii_lowercase();
  matches!(value.as_str(), "1" | "true" | "yes" | "on")
}

pub fn apply_env_defaults(config: EngineConfig) -> EngineConfig {
  apply_overrides(config, env_default)
}

/// Fills values the config file left empty from `lookup`, then falls back to
/// the built-in defaults.
pub fn apply_overrides<F>(mut config: EngineConfig, lookup: F) -> EngineConfig
where
  F: Fn(&str) -> Option<String>,
{
  fill_from(&mut config.template_path, lookup("BRACKET_TEMPLATE_PATH"));
  fill_from(&mut config.roster_path, lookup("BRACKET_ROSTER_PATH"));
  fill_from(&mut config.state_path, lookup("BRACKET_STATE_PATH"));
  fill_from(&mut config.log_dir, lookup("BRACKET_LOG_DIR"));
  if config.draw_seed.is_none() {
    config.draw_seed = lookup("BRACKET_DRAW_SEED").and_then(|value| value.trim().parse().ok());
  }
  if !config.reroll_on_start {
    config.reroll_on_start = lookup("BRACKET_REROLL").map(|value| parse_flag(&value)).unwrap_or(false);
  }

  fill_from(&mut config.template_path, Some(DEFAULT_TEMPLATE_PATH.to_string()));
  fill_from(&mut config.roster_path, Some(DEFAULT_ROSTER_PATH.to_string()));
  fill_from(&mut config.state_path, Some(DEFAULT_STATE_PATH.to_string()));
  fill_from(&mut config.log_dir, Some(DEFAULT_LOG_DIR.to_string()));
  fill_from(&mut config.log_filter, Some(DEFAULT_LOG_FILTER.to_string()));
  config
}

fn fill_from(field: &mut String, value: Option<String>) {
  if field.trim().is_empty() {
    if let Some(value) = value {
      *field = value;
    }
  }
}

pub fn load_config_inner() -> Result<EngineConfig, String> {
  load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig, String> {
  if !path.is_file() {
    return Ok(apply_env_defaults(EngineConfig::default()));
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<EngineConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn save_config_to(path: &Path, config: EngineConfig) -> Result<EngineConfig, String> {
  let payload = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
  fs::write(path, payload).map_err(|e| format!("write config {}: {e}", path.display()))?;
  Ok(config)
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

/// One `KEY=value` line of a `.env` file. Quoted values are taken verbatim;
/// unquoted ones stop at a `#`.
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let line = line.trim();
  if line.starts_with('#') {
    return None;
  }
  let line = line.strip_prefix("export ").unwrap_or(line);
  let (key, value) = line.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let value = value.trim();
  let value = ['"', '\'']
    .iter()
    .find_map(|quote| {
      value
        .strip_prefix(*quote)
        .and_then(|rest| rest.strip_suffix(*quote))
    })
    .unwrap_or_else(|| value.split('#').next().unwrap_or_default().trim_end());
  Some((key.to_string(), value.to_string()))
}

pub fn log_env_warnings(config: &EngineConfig) {
  let mut warnings = Vec::new();
  let template = resolve_repo_path(&config.template_path);
  let state = resolve_repo_path(&config.state_path);
  if !template.is_file() && !state.is_file() {
    warnings.push(format!(
      "no bracket template at {} and no saved state at {}; nothing to load",
      template.display(),
      state.display()
    ));
  }
  if config.draw_seed.is_some() {
    warnings.push("draw seed is fixed; every draw with the same roster is reproducible".to_string());
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
