//! Creation state machine
//!
//! ```text
//! Idle -> Encoding -> Persisting -> Wrapping -> Finalizing -> Idle
//! Idle -> MarginOnly -> Idle
//! ```
//!
//! Encoding and Wrapping may drop to MarginOnly; Encoding and Persisting may
//! abort back to Idle.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Stage of an annotation creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CreationStage {
    /// Nothing in flight
    #[default]
    Idle,
    /// Turning the selection into coordinates
    Encoding,
    /// Waiting for the store to assign an id
    Persisting,
    /// Inserting the inline marker
    Wrapping,
    /// Recomputing node numbers after the tree settled
    Finalizing,
    /// Rendering in the margin only
    MarginOnly,
}

/// Validates a stage transition
///
/// # Errors
/// Returns [`TransitionError`] if `to` is not reachable from `from`
pub fn validate_transition(from: CreationStage, to: CreationStage) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Stages reachable in one step
#[must_use]
pub fn allowed_transitions(from: CreationStage) -> &'static [CreationStage] {
    use CreationStage::{Encoding, Finalizing, Idle, MarginOnly, Persisting, Wrapping};
    match from {
        Idle => &[Encoding, MarginOnly],
        Encoding => &[Persisting, Idle, MarginOnly],
        Persisting => &[Wrapping, Idle],
        Wrapping => &[Finalizing, MarginOnly, Idle],
        Finalizing | MarginOnly => &[Idle],
    }
}
