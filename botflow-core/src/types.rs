//! Compiled artifact wire types.
//!
//! These are the shapes the execution engine consumes. Field spellings
//! (`connectVar`, lowercase state types) are part of the engine contract
//! and must not drift. An [`InstructionSet`] is never mutated after the
//! compiler assembles it.

use serde::{Deserialize, Serialize};

/// A catalog variable as emitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
}

/// One function parameter as emitted to the engine.
///
/// `connect_var` is always empty: the live variable-to-parameter binding is
/// dropped during compilation (known gap, not reconstructed here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "connectVar")]
    pub connect_var: String,
}

/// A catalog function as emitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub parameters: Vec<ParameterSpec>,
}

/// State classification in the emitted machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Start,
    State,
    Fallback,
}

/// One state of the emitted machine. `function` references the backing
/// catalog function by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "type")]
    pub kind: StateKind,
    pub name: String,
    pub function: String,
}

/// One transition of the emitted machine. `from`/`to` carry the *labels*
/// of the source and target nodes, not their ids — the engine resolves
/// states by label and the indirection must be preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub outcome: i64,
}

/// The compiled, ordered state-machine description served to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSet {
    pub name: String,
    pub variables: Vec<VariableSpec>,
    pub functions: Vec<FunctionSpec>,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}
