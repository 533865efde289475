//! Role (`cargo`) storage.
//!
//! Roles are keyed by the external registry's code and are only ever
//! upserted, never deleted.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgConnection;
use uuid::Uuid;

use gipe_auth::Role;

use crate::{PgPool, StorageError, StorageResult};

/// Role record from database.
#[derive(Debug, Clone)]
pub struct CargoRow {
    /// Registry code.
    pub codigo: i32,
    /// Display name.
    pub nome: String,
    /// Local stable id.
    pub uuid: Uuid,
}

impl CargoRow {
    fn from_tuple(row: (i32, String, Uuid)) -> Self {
        Self {
            codigo: row.0,
            nome: row.1,
            uuid: row.2,
        }
    }
}

impl From<CargoRow> for Role {
    fn from(row: CargoRow) -> Self {
        Role::new(row.codigo, row.nome)
    }
}

/// Role storage operations.
pub struct CargoStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> CargoStorage<'a> {
    /// Create a new role storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a role by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(&self, codigo: i32) -> StorageResult<Option<CargoRow>> {
        let row: Option<(i32, String, Uuid)> = query_as(
            r#"
            SELECT codigo, nome, uuid
            FROM cargo
            WHERE codigo = $1
            "#,
        )
        .bind(codigo)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(CargoRow::from_tuple))
    }

    /// List all roles ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> StorageResult<Vec<CargoRow>> {
        let rows: Vec<(i32, String, Uuid)> = query_as(
            r#"
            SELECT codigo, nome, uuid
            FROM cargo
            ORDER BY codigo
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CargoRow::from_tuple).collect())
    }

    /// Insert or rename a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn upsert(&self, role: &Role) -> StorageResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_in(&mut conn, role).await
    }
}

/// Upserts a role on an existing connection or transaction.
pub(crate) async fn upsert_in(conn: &mut PgConnection, role: &Role) -> StorageResult<()> {
    query(
        r#"
        INSERT INTO cargo (codigo, nome)
        VALUES ($1, $2)
        ON CONFLICT (codigo) DO UPDATE SET nome = EXCLUDED.nome
        "#,
    )
    .bind(role.codigo)
    .bind(&role.nome)
    .execute(conn)
    .await
    .map_err(|e| StorageError::from_write(e, "cargo upsert"))?;

    Ok(())
}
