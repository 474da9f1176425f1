//! Postgres catalog backend.
//!
//! Expected schema (one row per entity, all scoped by `job_id`):
//!
//! ```text
//! jobs(id uuid pk, title text, owner text)
//! graphs(job_id uuid pk references jobs, blob bytea)
//! functions(id uuid pk, job_id uuid references jobs, name text,
//!           description text, author text)
//! parameters(id uuid pk, function_id uuid references functions,
//!            name text, type text, io text, default_value text,
//!            required bool)
//! variables(job_id uuid references jobs, name text, type text, value text)
//! ```
//!
//! Each [`FunctionTxn`] maps to one `BEGIN … COMMIT`; any statement failing
//! drops the transaction, which rolls back the whole unit.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::catalog::{Function, Job, ParamIo, Parameter, Variable};
use crate::error::StoreError;
use crate::store::{CatalogStore, FunctionTxn};

/// Postgres-backed [`CatalogStore`].
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> PgCatalog {
        PgCatalog { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn aborted(e: sqlx::Error) -> StoreError {
    StoreError::TxAborted(e.to_string())
}

#[derive(sqlx::FromRow)]
struct FunctionRow {
    id: Uuid,
    name: String,
    description: String,
}

#[derive(sqlx::FromRow)]
struct ParameterRow {
    id: Uuid,
    function_id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    ty: String,
    io: String,
    default_value: String,
    required: bool,
}

impl ParameterRow {
    /// Store-boundary conversion: an unknown `io` string is rejected here,
    /// never passed downstream.
    fn into_parameter(self) -> Result<Parameter, StoreError> {
        Ok(Parameter {
            id: self.id,
            name: self.name,
            ty: self.ty,
            io: self.io.parse::<ParamIo>()?,
            default: self.default_value,
            required: self.required,
        })
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn job(&self, scope_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT id, title, owner FROM jobs WHERE id = $1")
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| Job {
            id: r.get("id"),
            title: r.get("title"),
            owner: r.get("owner"),
        }))
    }

    async fn graph_blob(&self, scope_id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        let row = sqlx::query("SELECT blob FROM graphs WHERE job_id = $1")
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.map(|r| r.get("blob")))
    }

    async fn functions(&self, scope_id: Uuid) -> Result<Vec<Function>, StoreError> {
        let function_rows: Vec<FunctionRow> = sqlx::query_as(
            "SELECT id, name, description FROM functions WHERE job_id = $1 ORDER BY name",
        )
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let param_rows: Vec<ParameterRow> = sqlx::query_as(
            "SELECT p.id, p.function_id, p.name, p.type, p.io, p.default_value, p.required \
             FROM parameters p \
             JOIN functions f ON f.id = p.function_id \
             WHERE f.job_id = $1 \
             ORDER BY p.name",
        )
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut functions: Vec<Function> = function_rows
            .into_iter()
            .map(|r| Function {
                id: r.id,
                name: r.name,
                description: r.description,
                parameters: Vec::new(),
            })
            .collect();
        for row in param_rows {
            let function_id = row.function_id;
            let parameter = row.into_parameter()?;
            if let Some(f) = functions.iter_mut().find(|f| f.id == function_id) {
                f.parameters.push(parameter);
            }
        }
        Ok(functions)
    }

    async fn variables(&self, scope_id: Uuid) -> Result<Vec<Variable>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, type, value FROM variables WHERE job_id = $1 ORDER BY name",
        )
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|r| Variable {
                name: r.get("name"),
                ty: r.get("type"),
                value: r.get("value"),
            })
            .collect())
    }

    async fn apply(&self, scope_id: Uuid, unit: FunctionTxn) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        match unit {
            FunctionTxn::Update {
                function_id,
                name,
                description,
                keep,
                create,
                delete,
            } => {
                sqlx::query(
                    "UPDATE functions SET name = $1, description = $2 \
                     WHERE id = $3 AND job_id = $4",
                )
                .bind(&name)
                .bind(&description)
                .bind(function_id)
                .bind(scope_id)
                .execute(&mut *tx)
                .await
                .map_err(aborted)?;

                for p in &keep {
                    sqlx::query(
                        "UPDATE parameters SET name = $1, type = $2, io = $3, \
                         default_value = $4, required = $5 WHERE id = $6",
                    )
                    .bind(&p.name)
                    .bind(&p.ty)
                    .bind(p.io.as_str())
                    .bind(&p.default)
                    .bind(p.required)
                    .bind(p.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(aborted)?;
                }

                for p in &create {
                    insert_parameter(&mut tx, function_id, p).await?;
                }

                if !delete.is_empty() {
                    sqlx::query("DELETE FROM parameters WHERE id = ANY($1)")
                        .bind(&delete)
                        .execute(&mut *tx)
                        .await
                        .map_err(aborted)?;
                }
            }
            FunctionTxn::Create { function, owner } => {
                sqlx::query(
                    "INSERT INTO functions (id, job_id, name, description, author) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(function.id)
                .bind(scope_id)
                .bind(&function.name)
                .bind(&function.description)
                .bind(&owner)
                .execute(&mut *tx)
                .await
                .map_err(aborted)?;

                for p in &function.parameters {
                    insert_parameter(&mut tx, function.id, p).await?;
                }
            }
        }

        tx.commit().await.map_err(aborted)
    }
}

async fn insert_parameter(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    function_id: Uuid,
    p: &Parameter,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO parameters (id, function_id, name, type, io, default_value, required) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(p.id)
    .bind(function_id)
    .bind(&p.name)
    .bind(&p.ty)
    .bind(p.io.as_str())
    .bind(&p.default)
    .bind(p.required)
    .execute(&mut **tx)
    .await
    .map_err(aborted)?;
    Ok(())
}
