//! Organizational unit (`unidade`) storage.
//!
//! Units are read-mostly. `save` validates a unit against its stored parent
//! before writing so the DRE hierarchy stays one level deep.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use uuid::Uuid;

use gipe_auth::{Network, Unit, UnitSummary, UnitType};

use crate::{PgPool, StorageError, StorageResult};

type UnidadeTuple = (String, String, String, String, Option<String>, String);

fn unit_from_tuple(row: UnidadeTuple) -> StorageResult<Unit> {
    let tipo_unidade = row
        .2
        .parse::<UnitType>()
        .map_err(StorageError::invalid_input)?;
    let rede = row.3.parse::<Network>().map_err(StorageError::invalid_input)?;

    Ok(Unit {
        codigo_eol: row.0,
        nome: row.1,
        tipo_unidade,
        rede,
        dre: row.4,
        sigla: row.5,
    })
}

/// Organizational unit storage operations.
pub struct UnidadeStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UnidadeStorage<'a> {
    /// Create a new unit storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a unit by its institutional code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is malformed.
    pub async fn find_by_code(&self, codigo_eol: &str) -> StorageResult<Option<Unit>> {
        let row: Option<UnidadeTuple> = query_as(
            r#"
            SELECT codigo_eol, nome, tipo_unidade, rede, dre_id, sigla
            FROM unidade
            WHERE codigo_eol = $1
            "#,
        )
        .bind(codigo_eol)
        .fetch_optional(self.pool)
        .await?;

        row.map(unit_from_tuple).transpose()
    }

    /// List all DRE-typed units ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row is malformed.
    pub async fn list_dres(&self) -> StorageResult<Vec<Unit>> {
        let rows: Vec<UnidadeTuple> = query_as(
            r#"
            SELECT codigo_eol, nome, tipo_unidade, rede, dre_id, sigla
            FROM unidade
            WHERE tipo_unidade = 'DRE'
            ORDER BY nome
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(unit_from_tuple).collect()
    }

    /// Insert or update a unit.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidInput` if the unit fails validation against
    ///   its stored parent
    /// - `StorageError::Database` if the write fails
    pub async fn save(&self, unit: &Unit) -> StorageResult<()> {
        let parent = match unit.dre.as_deref() {
            Some(code) => self.find_by_code(code).await?,
            None => None,
        };
        unit.validate(parent.as_ref())
            .map_err(|e| StorageError::invalid_input(e.to_string()))?;

        query(
            r#"
            INSERT INTO unidade (codigo_eol, nome, tipo_unidade, rede, dre_id, sigla)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (codigo_eol) DO UPDATE SET
                nome = EXCLUDED.nome,
                tipo_unidade = EXCLUDED.tipo_unidade,
                rede = EXCLUDED.rede,
                dre_id = EXCLUDED.dre_id,
                sigla = EXCLUDED.sigla,
                alterado_em = NOW()
            "#,
        )
        .bind(&unit.codigo_eol)
        .bind(&unit.nome)
        .bind(unit.tipo_unidade.as_str())
        .bind(unit.rede.as_str())
        .bind(unit.dre.as_deref())
        .bind(&unit.sigla)
        .execute(self.pool)
        .await
        .map_err(|e| StorageError::from_write(e, "unidade upsert"))?;

        Ok(())
    }

    /// Assigns a unit to a principal. Assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either side does not exist or the write fails.
    pub async fn assign_to_user(&self, usuario_id: Uuid, codigo_eol: &str) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO usuario_unidades (usuario_id, unidade_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(usuario_id)
        .bind(codigo_eol)
        .execute(self.pool)
        .await
        .map_err(|e| StorageError::from_write(e, "usuario_unidades insert"))?;

        Ok(())
    }

    /// Summaries of the units assigned to a principal, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn units_for_user(&self, usuario_id: Uuid) -> StorageResult<Vec<UnitSummary>> {
        let rows: Vec<(String, String)> = query_as(
            r#"
            SELECT un.codigo_eol, un.nome
            FROM usuario_unidades uu
            JOIN unidade un ON un.codigo_eol = uu.unidade_id
            WHERE uu.usuario_id = $1
            ORDER BY un.codigo_eol
            "#,
        )
        .bind(usuario_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(codigo, nome_unidade)| UnitSummary {
                codigo,
                nome_unidade,
            })
            .collect())
    }
}
