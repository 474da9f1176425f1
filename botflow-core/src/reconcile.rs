//! Catalog reconciler.
//!
//! Merges an externally pushed batch of function/parameter definitions
//! into one scope's catalog. Two strictly sequential phases:
//!
//! 1. **Phase A** rewrites functions the catalog already has — kept
//!    parameters are idempotently rewritten, new ones created with
//!    placeholder metadata, stale ones deleted — one atomic store unit per
//!    function.
//! 2. **Phase B** creates the functions the catalog lacks, attributed to
//!    the scope owner, one atomic unit per function. It begins only after
//!    every Phase A unit has committed, because later catalog reads assume
//!    Phase A's state is durable first.
//!
//! Within a phase, units touch disjoint rows and run concurrently; one
//! unit failing does not roll back another. Two concurrent passes over the
//! same scope can still race — callers that cannot accept that must
//! serialize passes per scope.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{Function, FunctionDef, Parameter};
use crate::error::{ReconcileError, StoreError};
use crate::store::{CatalogStore, FunctionTxn};

/// Default hard limit on one reconciliation pass. Expiry rolls back any
/// in-flight unit (the store drops its transaction) and surfaces
/// [`ReconcileError::Timeout`].
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30);

/// What one pass did, by function name, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ReconcileReport {
    pub updated: Vec<String>,
    pub created: Vec<String>,
}

/// Transactional diff/merge engine over a [`CatalogStore`].
pub struct Reconciler {
    store: Arc<dyn CatalogStore>,
    pass_timeout: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn CatalogStore>) -> Reconciler {
        Reconciler {
            store,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }

    pub fn with_pass_timeout(mut self, timeout: Duration) -> Reconciler {
        self.pass_timeout = timeout;
        self
    }

    /// Run one reconciliation pass for `scope_id`.
    ///
    /// Batch-shape violations (empty batch, duplicate names after
    /// trimming) reject the whole pass before any store mutation.
    pub async fn reconcile(
        &self,
        scope_id: Uuid,
        incoming: Vec<FunctionDef>,
    ) -> Result<ReconcileReport, ReconcileError> {
        match tokio::time::timeout(self.pass_timeout, self.run(scope_id, incoming)).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::Timeout),
        }
    }

    async fn run(
        &self,
        scope_id: Uuid,
        incoming: Vec<FunctionDef>,
    ) -> Result<ReconcileReport, ReconcileError> {
        if incoming.is_empty() {
            return Err(ReconcileError::EmptyBatch);
        }

        // Duplicate names in one batch would make the outcome depend on
        // unit scheduling; reject deterministically instead.
        let mut seen = HashSet::new();
        for def in &incoming {
            let name = def.name.trim();
            if !seen.insert(name.to_string()) {
                return Err(ReconcileError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        let job = self
            .store
            .job(scope_id)
            .await?
            .ok_or(ReconcileError::UnknownScope(scope_id))?;
        let existing = self.store.functions(scope_id).await?;
        let by_name: HashMap<&str, &Function> =
            existing.iter().map(|f| (f.name.as_str(), f)).collect();

        // Partition: existing functions are Phase A, the rest Phase B.
        let mut phase_a = Vec::new();
        let mut phase_b = Vec::new();
        for def in &incoming {
            match by_name.get(def.name.trim()) {
                Some(stored) => phase_a.push(plan_update(stored, def)),
                None => phase_b.push(plan_create(def, &job.owner)),
            }
        }

        let updated = self.commit_phase(scope_id, "A", phase_a).await?;
        // Phase B starts only once every Phase A unit has committed.
        let created = self.commit_phase(scope_id, "B", phase_b).await?;
        let report = ReconcileReport { updated, created };

        info!(
            scope = %scope_id,
            updated = report.updated.len(),
            created = report.created.len(),
            "reconciliation pass complete"
        );
        Ok(report)
    }

    /// Dispatch one phase's units concurrently and wait for all of them.
    /// Failures are isolated per unit; if any unit failed, the first
    /// failure (by function name) is reported after the rest have settled.
    async fn commit_phase(
        &self,
        scope_id: Uuid,
        phase: &str,
        units: Vec<FunctionTxn>,
    ) -> Result<Vec<String>, ReconcileError> {
        let mut tasks = JoinSet::new();
        for unit in units {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                let name = unit.function_name().to_string();
                (name, store.apply(scope_id, unit).await)
            });
        }

        let mut committed = Vec::new();
        let mut failures: Vec<(String, StoreError)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined
                .map_err(|e| StoreError::Backend(format!("reconcile worker panicked: {e}")))?;
            match result {
                Ok(()) => committed.push(name),
                Err(source) => {
                    warn!(scope = %scope_id, phase, function = %name, error = %source,
                        "reconcile unit rolled back");
                    failures.push((name, source));
                }
            }
        }

        if let Some((name, source)) = failures
            .into_iter()
            .min_by(|a, b| a.0.cmp(&b.0))
        {
            return Err(ReconcileError::Txn { name, source });
        }
        committed.sort();
        Ok(committed)
    }
}

/// Diff an incoming definition against its stored counterpart into one
/// atomic update unit.
fn plan_update(stored: &Function, def: &FunctionDef) -> FunctionTxn {
    let stored_by_name: HashMap<&str, &Parameter> =
        stored.parameters.iter().map(|p| (p.name.as_str(), p)).collect();
    let incoming_names: HashSet<&str> = def.parameters.iter().map(|p| p.name.as_str()).collect();

    // Incoming parameters the store lacks: created with placeholder
    // metadata; the editor supplies the semantic richness later.
    let create: Vec<Parameter> = def
        .parameters
        .iter()
        .filter(|p| !stored_by_name.contains_key(p.name.as_str()))
        .map(|p| Parameter::placeholder(&p.name, &p.ty))
        .collect();

    // Stored parameters absent from the incoming list: stale, deleted.
    let delete: Vec<Uuid> = stored
        .parameters
        .iter()
        .filter(|p| !incoming_names.contains(p.name.as_str()))
        .map(|p| p.id)
        .collect();

    // Stored parameters the incoming list still names: rewritten with
    // their own current values, purely to pin the rows to the transaction.
    let keep: Vec<Parameter> = stored
        .parameters
        .iter()
        .filter(|p| incoming_names.contains(p.name.as_str()))
        .cloned()
        .collect();

    FunctionTxn::Update {
        function_id: stored.id,
        name: stored.name.clone(),
        description: def
            .description
            .clone()
            .unwrap_or_else(|| stored.description.clone()),
        keep,
        create,
        delete,
    }
}

/// Plan one brand-new function plus all of its parameters. Attribution
/// goes to the scope owner, never to the pushing caller.
fn plan_create(def: &FunctionDef, owner: &str) -> FunctionTxn {
    FunctionTxn::Create {
        function: Function {
            id: Uuid::now_v7(),
            name: def.name.trim().to_string(),
            description: def.description.clone().unwrap_or_default(),
            parameters: def
                .parameters
                .iter()
                .map(|p| Parameter::placeholder(&p.name, &p.ty))
                .collect(),
        },
        owner: owner.to_string(),
    }
}
