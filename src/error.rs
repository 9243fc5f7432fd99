use std::path::Path;
use thiserror::Error;

use crate::types::MatchId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BracketError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("match {0}: entrants not yet determined")]
    EntrantsNotDetermined(MatchId),
    #[error("template has no matches")]
    EmptyTemplate,
    #[error("duplicate match id {0}")]
    DuplicateMatchId(MatchId),
    #[error("duplicate match order {0}")]
    DuplicateOrder(u64),
    #[error("match {match_id} references unknown match {target}")]
    UnknownReference { match_id: MatchId, target: MatchId },
    #[error("match {match_id} references match {target}, which is not earlier in the bracket")]
    ForwardReference { match_id: MatchId, target: MatchId },
    #[error("io {path}: {message}")]
    Io { path: String, message: String },
    #[error("parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl BracketError {
    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        BracketError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        BracketError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
