//! Catalog domain model.
//!
//! The catalog is the stored set of functions, parameters, and variables
//! owned by a scope (job). The reconciler writes it; the compiler reads a
//! [`CatalogSnapshot`] of it. The snapshot constructor owns list ordering
//! so that two compiles of unchanged inputs are byte-identical.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// The owning unit under which functions, variables, and the graph
/// document are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    /// Account that owns the scope. New functions pushed by an external
    /// authority are attributed to this owner, never to the caller.
    pub owner: String,
}

/// Direction of a function parameter. Closed enum: the persisted string
/// forms are `"input"`/`"output"` and anything else is rejected at the
/// store boundary rather than tolerated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamIo {
    Input,
    Output,
}

impl ParamIo {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamIo::Input => "input",
            ParamIo::Output => "output",
        }
    }
}

impl std::str::FromStr for ParamIo {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(ParamIo::Input),
            "output" => Ok(ParamIo::Output),
            other => Err(StoreError::InvalidIo(other.to_string())),
        }
    }
}

/// A stored function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub io: ParamIo,
    pub default: String,
    pub required: bool,
}

impl Parameter {
    /// A parameter row created by reconciliation: minimal placeholder
    /// metadata, enriched later by the editor.
    pub fn placeholder(name: &str, ty: &str) -> Parameter {
        Parameter {
            id: Uuid::now_v7(),
            name: name.to_string(),
            ty: ty.to_string(),
            io: ParamIo::Input,
            default: String::new(),
            required: false,
        }
    }
}

/// A stored catalog function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

/// A stored catalog variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
}

// ── Incoming push batch ──

/// An externally pushed parameter definition (name and type only; the rest
/// of the parameter's metadata belongs to the editor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// An externally pushed function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
}

// ── Snapshot handed to the compiler ──

/// A read-only view of one scope's catalog, with deterministic ordering:
/// functions by name ascending, each function's parameters by name
/// ascending, variables by name ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub job_title: String,
    pub functions: Vec<Function>,
    pub variables: Vec<Variable>,
}

impl CatalogSnapshot {
    pub fn new(
        job_title: impl Into<String>,
        mut functions: Vec<Function>,
        mut variables: Vec<Variable>,
    ) -> CatalogSnapshot {
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        for f in &mut functions {
            f.parameters.sort_by(|a, b| a.name.cmp(&b.name));
        }
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        CatalogSnapshot {
            job_title: job_title.into(),
            functions,
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_orders_everything_by_name() {
        let f = |name: &str, params: &[&str]| Function {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: String::new(),
            parameters: params.iter().map(|p| Parameter::placeholder(p, "text")).collect(),
        };
        let v = |name: &str| Variable {
            name: name.to_string(),
            ty: "text".into(),
            value: String::new(),
        };

        let snap = CatalogSnapshot::new(
            "job",
            vec![f("exit", &[]), f("Fetch", &["url", "body"]), f("start", &[])],
            vec![v("zeta"), v("alpha")],
        );

        let names: Vec<&str> = snap.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Fetch", "exit", "start"]);
        let params: Vec<&str> = snap.functions[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(params, vec!["body", "url"]);
        assert_eq!(snap.variables[0].name, "alpha");
    }

    #[test]
    fn io_rejects_empty_and_unknown_values() {
        assert_eq!("input".parse::<ParamIo>(), Ok(ParamIo::Input));
        assert_eq!("output".parse::<ParamIo>(), Ok(ParamIo::Output));
        assert!("".parse::<ParamIo>().is_err());
        assert!("Input".parse::<ParamIo>().is_err());
        assert!("inout".parse::<ParamIo>().is_err());
    }
}
