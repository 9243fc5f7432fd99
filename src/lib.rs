pub mod types;
pub mod config;
pub mod error;
pub mod logging;
pub mod slot;
pub mod draw;
pub mod resolver;
pub mod template;
pub mod bracket;
pub mod store;
pub mod commands;

use types::*;
use config::*;

use std::sync::{Arc, Mutex};
use tracing::{error, info};

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}; falling back to defaults");
            apply_env_defaults(EngineConfig::default())
        }
    };

    // Initialize tracing with daily file output
    let guard = match logging::init_tracing(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };
    info!("Bracket engine starting");
    log_env_warnings(&config);

    let session: SharedBracket = Arc::new(Mutex::new(BracketSession::default()));
    let view = match commands::bracket_load(&session, &config) {
        Ok(view) => view,
        Err(e) => {
            error!("bracket load failed: {e}");
            eprintln!("bracket load failed: {e}");
            drop(guard);
            std::process::exit(1);
        }
    };

    let ready = commands::bracket_ready_matches(&session).unwrap_or_default();
    info!(
        "{} match(es) resolved, {} ready to play",
        view.matches.len(),
        ready.len()
    );
    match serde_json::to_string_pretty(&view) {
        Ok(payload) => println!("{payload}"),
        Err(e) => error!("serialize resolved view: {e}"),
    }
}
