//! botflow-core — digital-worker graph compilation and catalog
//! reconciliation.
//!
//! An author builds a digital worker as a visual graph of functions,
//! variables, and control-flow links. This crate owns the two hard pieces
//! behind that editor:
//!
//! - [`compiler::compile`] turns a persisted graph document plus a catalog
//!   snapshot into the named, ordered state-machine description (the
//!   "instruction set") the external execution engine consumes;
//! - [`reconcile::Reconciler`] merges externally pushed function/parameter
//!   definitions into the catalog under all-or-nothing per-function
//!   transactions.
//!
//! Everything else — the editor, auth, routing, the storage engine — sits
//! behind the narrow contracts in [`store`] and the HTTP layer in the
//! companion server crate.

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod handle;
pub mod reconcile;
pub mod store;
pub mod types;

pub use catalog::{CatalogSnapshot, Function, FunctionDef, Job, ParamDef, ParamIo, Parameter, Variable};
pub use compiler::compile;
pub use error::{CompileError, ParseError, ReconcileError, StateRole, StoreError};
pub use graph::GraphDocument;
pub use reconcile::{ReconcileReport, Reconciler};
pub use store::{load_snapshot, CatalogStore, FunctionTxn, MemoryCatalog};
pub use types::InstructionSet;
