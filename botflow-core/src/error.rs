//! Error taxonomy for the compiler and reconciler.
//!
//! Every failure mode surfaced to callers maps to exactly one variant here.
//! Dangling edge endpoints are deliberately absent: the compiler recovers
//! from those locally and they never become errors.

use uuid::Uuid;

/// Failure parsing a persisted graph document.
///
/// `Empty` is a distinct case because the editor persists an empty blob for
/// a document that has never been saved; callers may treat that as a blank
/// graph rather than corruption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty graph document")]
    Empty,

    #[error("corrupt graph document: {0}")]
    Corrupt(String),
}

/// The state-machine role a catalog is required to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRole {
    Start,
    Exit,
}

impl std::fmt::Display for StateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateRole::Start => write!(f, "start"),
            StateRole::Exit => write!(f, "exit"),
        }
    }
}

fn fmt_missing(missing: &[StateRole]) -> String {
    missing
        .iter()
        .map(|role| format!("No {role} function found"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiler invariant violation. Both presence checks run before this is
/// built, so a catalog missing both `start` and `exit` reports both roles
/// in one error instead of hiding the second behind the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{}", fmt_missing(.missing))]
    MissingStates { missing: Vec<StateRole> },
}

/// Catalog store failure. `TxAborted` guarantees the failed unit left no
/// partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("catalog backend failure: {0}")]
    Backend(String),

    #[error("transaction aborted: {0}")]
    TxAborted(String),

    #[error("unknown scope {0}")]
    UnknownScope(Uuid),

    #[error("invalid parameter io value '{0}'")]
    InvalidIo(String),
}

/// Reconciliation failure. Batch-shape violations (`EmptyBatch`,
/// `DuplicateName`) are detected before any store mutation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("empty function batch")]
    EmptyBatch,

    #[error("duplicate function name '{name}' in batch")]
    DuplicateName { name: String },

    #[error("unknown scope {0}")]
    UnknownScope(Uuid),

    #[error("catalog transaction failed for '{name}': {source}")]
    Txn { name: String, source: StoreError },

    #[error("reconciliation pass timed out")]
    Timeout,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_states_reports_every_role() {
        let err = CompileError::MissingStates {
            missing: vec![StateRole::Start, StateRole::Exit],
        };
        let msg = err.to_string();
        assert!(msg.contains("No start function found"));
        assert!(msg.contains("No exit function found"));
    }

    #[test]
    fn missing_start_message_matches_engine_contract() {
        let err = CompileError::MissingStates {
            missing: vec![StateRole::Start],
        };
        assert_eq!(err.to_string(), "No start function found");
    }
}
