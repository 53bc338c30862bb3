//! Transitions accepted by the talk list reducer and controller errors.

use shared::domain::{DraftField, Talk};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Replace the whole talk list.
    Set(Vec<Talk>),
    /// Append one talk created by another client.
    Add(Talk),
    /// A fetch failed; sets the sticky error flag.
    Error,
    UpdateField { field: DraftField, value: String },
}

impl Transition {
    pub fn kind(&self) -> &'static str {
        match self {
            Transition::Set(_) => "set",
            Transition::Add(_) => "add",
            Transition::Error => "error",
            Transition::UpdateField { .. } => "update_field",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("unknown transition: {0}")]
    UnknownTransition(String),
}
