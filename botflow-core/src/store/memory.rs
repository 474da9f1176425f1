//! In-memory catalog backend.
//!
//! Backs tests and single-process POC deployments. `apply` validates the
//! whole unit against a working copy before swapping it in under one write
//! lock, so a failed unit is never partially visible — the same guarantee
//! the Postgres backend gets from transactions.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::{Function, Job, Variable};
use crate::error::StoreError;
use crate::store::{CatalogStore, FunctionTxn};

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    graphs: HashMap<Uuid, Vec<u8>>,
    functions: HashMap<Uuid, Vec<Function>>,
    variables: HashMap<Uuid, Vec<Variable>>,
    /// function id → attributed author, recorded on create.
    authors: HashMap<Uuid, String>,
}

/// In-memory [`CatalogStore`].
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
    /// Test hook: aborts any unit that would create a parameter with this
    /// name, after the working copy has been built but before it is
    /// swapped in. Used to verify unit atomicity via read-back.
    param_fault: Mutex<Option<String>>,
}

impl MemoryCatalog {
    pub fn new() -> MemoryCatalog {
        MemoryCatalog::default()
    }

    pub async fn add_job(&self, job: Job) {
        let mut inner = self.inner.write().await;
        inner.functions.entry(job.id).or_default();
        inner.variables.entry(job.id).or_default();
        inner.jobs.insert(job.id, job);
    }

    pub async fn put_graph(&self, scope_id: Uuid, blob: Vec<u8>) {
        self.inner.write().await.graphs.insert(scope_id, blob);
    }

    pub async fn add_variable(&self, scope_id: Uuid, variable: Variable) {
        self.inner
            .write()
            .await
            .variables
            .entry(scope_id)
            .or_default()
            .push(variable);
    }

    /// Author a created function was attributed to.
    pub async fn author_of(&self, function_id: Uuid) -> Option<String> {
        self.inner.read().await.authors.get(&function_id).cloned()
    }

    /// Arm the parameter-creation fault. The next unit that tries to
    /// create a parameter with `name` fails with `TxAborted`.
    pub fn inject_param_fault(&self, name: &str) {
        *self.param_fault.lock().expect("fault lock") = Some(name.to_string());
    }

    fn fault_hit(&self, unit: &FunctionTxn) -> bool {
        let guard = self.param_fault.lock().expect("fault lock");
        let Some(poisoned) = guard.as_deref() else {
            return false;
        };
        let created = match unit {
            FunctionTxn::Update { create, .. } => create,
            FunctionTxn::Create { function, .. } => &function.parameters,
        };
        created.iter().any(|p| p.name == poisoned)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn job(&self, scope_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.inner.read().await.jobs.get(&scope_id).cloned())
    }

    async fn graph_blob(&self, scope_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.read().await.graphs.get(&scope_id).cloned())
    }

    async fn functions(&self, scope_id: Uuid) -> Result<Vec<Function>, StoreError> {
        let inner = self.inner.read().await;
        let mut functions = inner
            .functions
            .get(&scope_id)
            .cloned()
            .ok_or(StoreError::UnknownScope(scope_id))?;
        for f in &mut functions {
            f.parameters.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(functions)
    }

    async fn variables(&self, scope_id: Uuid) -> Result<Vec<Variable>, StoreError> {
        let inner = self.inner.read().await;
        let mut variables = inner
            .variables
            .get(&scope_id)
            .cloned()
            .ok_or(StoreError::UnknownScope(scope_id))?;
        variables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(variables)
    }

    async fn apply(&self, scope_id: Uuid, unit: FunctionTxn) -> Result<(), StoreError> {
        if self.fault_hit(&unit) {
            return Err(StoreError::TxAborted(format!(
                "injected fault applying '{}'",
                unit.function_name()
            )));
        }

        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let functions = inner
            .functions
            .get_mut(&scope_id)
            .ok_or(StoreError::UnknownScope(scope_id))?;

        match unit {
            FunctionTxn::Update {
                function_id,
                name,
                description,
                keep,
                create,
                delete,
            } => {
                let stored = functions
                    .iter_mut()
                    .find(|f| f.id == function_id)
                    .ok_or_else(|| {
                        StoreError::TxAborted(format!("function {function_id} vanished"))
                    })?;

                // Build the replacement on a working copy so a failure here
                // leaves the stored row untouched.
                let mut next = stored.clone();
                next.name = name;
                next.description = description;
                next.parameters.retain(|p| !delete.contains(&p.id));
                for kept in keep {
                    let row = next
                        .parameters
                        .iter_mut()
                        .find(|p| p.id == kept.id)
                        .ok_or_else(|| {
                            StoreError::TxAborted(format!("parameter {} vanished", kept.id))
                        })?;
                    *row = kept;
                }
                next.parameters.extend(create);
                *stored = next;
            }
            FunctionTxn::Create { function, owner } => {
                if functions.iter().any(|f| f.name == function.name) {
                    return Err(StoreError::TxAborted(format!(
                        "function '{}' already exists",
                        function.name
                    )));
                }
                let function_id = function.id;
                functions.push(function);
                inner.authors.insert(function_id, owner);
            }
        }
        Ok(())
    }
}
