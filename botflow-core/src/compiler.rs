//! Graph-to-instruction-set compiler.
//!
//! A pure, synchronous transform: persisted graph document + catalog
//! snapshot in, engine-facing [`InstructionSet`] out. The compiler never
//! performs I/O and never suspends; the caller loads the snapshot (see
//! [`crate::store::load_snapshot`]) and hands it in by reference.
//!
//! Determinism contract: identical document + snapshot produce a
//! byte-identical serialized artifact, including list ordering. Ordering is
//! owned by [`CatalogSnapshot`]'s constructor, and transitions follow the
//! document's edge order.

use tracing::debug;

use crate::catalog::CatalogSnapshot;
use crate::error::{CompileError, StateRole};
use crate::graph::GraphDocument;
use crate::handle::{decode_control_flow, is_entry_handle};
use crate::types::{
    FunctionSpec, InstructionSet, ParameterSpec, State, StateKind, Transition, VariableSpec,
};

/// Compile a graph document against a catalog snapshot.
///
/// Fails only at invariant validation (missing `start`/`exit` functions);
/// past that point the transform cannot fail. Edges whose endpoints cannot
/// be resolved to labeled nodes are dropped from the transition list, not
/// reported — the store does not guarantee referential integrity and a
/// half-deleted node must not block compilation.
pub fn compile(
    doc: &GraphDocument,
    catalog: &CatalogSnapshot,
) -> Result<InstructionSet, CompileError> {
    let variables: Vec<VariableSpec> = catalog
        .variables
        .iter()
        .map(|v| VariableSpec {
            name: v.name.clone(),
            ty: v.ty.clone(),
            value: v.value.clone(),
        })
        .collect();

    let functions: Vec<FunctionSpec> = catalog
        .functions
        .iter()
        .map(|f| FunctionSpec {
            name: f.name.clone(),
            parameters: f
                .parameters
                .iter()
                .map(|p| ParameterSpec {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                    // Live variable binding is not reconstructed.
                    connect_var: String::new(),
                })
                .collect(),
        })
        .collect();

    let (states, missing) = classify_states(catalog);
    if !missing.is_empty() {
        return Err(CompileError::MissingStates { missing });
    }

    let transitions = extract_transitions(doc);

    Ok(InstructionSet {
        name: catalog.job_title.clone(),
        variables,
        functions,
        states,
        transitions,
    })
}

/// Classify every catalog function into a machine state and report which
/// required roles are absent. Both role checks always run so a catalog
/// missing `start` and `exit` reports both at once.
fn classify_states(catalog: &CatalogSnapshot) -> (Vec<State>, Vec<StateRole>) {
    let mut states = Vec::with_capacity(catalog.functions.len());
    let mut contains_start = false;
    let mut contains_exit = false;

    for f in &catalog.functions {
        let kind = match f.name.trim().to_lowercase().as_str() {
            "start" => {
                contains_start = true;
                StateKind::Start
            }
            "exit" => {
                contains_exit = true;
                StateKind::Fallback
            }
            _ => StateKind::State,
        };
        states.push(State {
            kind,
            name: format!("{} state", f.name),
            function: f.name.clone(),
        });
    }

    let mut missing = Vec::new();
    if !contains_start {
        missing.push(StateRole::Start);
    }
    if !contains_exit {
        missing.push(StateRole::Exit);
    }
    (states, missing)
}

/// Walk the document's edges and keep only the control-flow layer: source
/// handle decodes to an outcome and target handle is the entry handle.
/// Endpoints resolve to node *labels*, the engine's naming indirection.
fn extract_transitions(doc: &GraphDocument) -> Vec<Transition> {
    let mut transitions = Vec::new();
    for edge in doc.edges() {
        let decoded = edge.source_handle.as_deref().and_then(decode_control_flow);
        let enters = edge
            .target_handle
            .as_deref()
            .is_some_and(is_entry_handle);
        if decoded.is_none() || !enters {
            continue;
        }

        let (Some(from), Some(to)) = (doc.label_of(&edge.source), doc.label_of(&edge.target))
        else {
            debug!(edge = %edge.id, "dropping edge with unresolvable endpoint");
            continue;
        };

        transitions.push(Transition {
            from: from.to_string(),
            to: to.to_string(),
            // The filter above guarantees Some; 1 is a defensive default.
            outcome: decoded.unwrap_or(1),
        });
    }
    transitions
}
