//! Catalog persistence.
//!
//! The compiler and reconciler operate exclusively through the
//! [`CatalogStore`] trait, enabling pluggable backends: [`MemoryCatalog`]
//! for tests and POC use, Postgres for production (behind the `postgres`
//! feature). Every mutation goes through [`CatalogStore::apply`], which
//! executes exactly one atomic unit per call; there is no cross-unit
//! locking, so consistency comes purely from per-unit atomicity.

mod memory;
#[cfg(feature = "postgres")]
mod pg;

pub use memory::MemoryCatalog;
#[cfg(feature = "postgres")]
pub use pg::PgCatalog;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{CatalogSnapshot, Function, Job, Parameter, Variable};
use crate::error::StoreError;

/// One atomic write unit against a single function. Partial failure
/// anywhere inside a unit rolls back the whole unit; failures never leak
/// across units.
#[derive(Debug, Clone)]
pub enum FunctionTxn {
    /// Rewrite an existing function: update its row, idempotently rewrite
    /// the kept parameters (a no-op write that guarantees the rows exist
    /// post-transaction), create the new ones, delete the stale ones.
    Update {
        function_id: Uuid,
        name: String,
        description: String,
        keep: Vec<Parameter>,
        create: Vec<Parameter>,
        delete: Vec<Uuid>,
    },
    /// Create a function and all of its parameters. `owner` is the scope
    /// owner, never the pushing caller.
    Create { function: Function, owner: String },
}

impl FunctionTxn {
    /// Name of the function this unit touches (for logs and error context).
    pub fn function_name(&self) -> &str {
        match self {
            FunctionTxn::Update { name, .. } => name,
            FunctionTxn::Create { function, .. } => &function.name,
        }
    }
}

/// Persistence contract for one scope's catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a scope. `None` means the scope does not exist.
    async fn job(&self, scope_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// The persisted graph blob for a scope, if the editor has saved one.
    async fn graph_blob(&self, scope_id: Uuid) -> Result<Option<Vec<u8>>, StoreError>;

    /// All functions of a scope. Each function's parameters are returned
    /// sorted by name ascending.
    async fn functions(&self, scope_id: Uuid) -> Result<Vec<Function>, StoreError>;

    /// All variables of a scope, sorted by name ascending.
    async fn variables(&self, scope_id: Uuid) -> Result<Vec<Variable>, StoreError>;

    /// Execute one atomic write unit. On `Err`, the unit left no partial
    /// mutation behind.
    async fn apply(&self, scope_id: Uuid, unit: FunctionTxn) -> Result<(), StoreError>;
}

/// Load the compiler-facing snapshot for a scope. Returns `None` when the
/// scope does not exist. Ordering is owned by [`CatalogSnapshot::new`].
pub async fn load_snapshot(
    store: &dyn CatalogStore,
    scope_id: Uuid,
) -> Result<Option<CatalogSnapshot>, StoreError> {
    let Some(job) = store.job(scope_id).await? else {
        return Ok(None);
    };
    let functions = store.functions(scope_id).await?;
    let variables = store.variables(scope_id).await?;
    Ok(Some(CatalogSnapshot::new(job.title, functions, variables)))
}
