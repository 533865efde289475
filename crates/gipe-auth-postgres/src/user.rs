//! Principal (`usuario`) storage.
//!
//! Reads always join the bound role so a [`Principal`] comes back complete.
//! The reconciled upsert writes the role and the principal in one
//! transaction.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use gipe_auth::{Network, Principal, ReconciledIdentity, Role};

use crate::cargo;
use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type UserTuple = (
    Uuid,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    bool,
    bool,
    Option<OffsetDateTime>,
    i32,
    String,
);

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.name, u.cpf, u.email, u.password, u.rede,
           u.is_validado, u.is_core_sso, u.last_login, c.codigo, c.nome
    FROM usuario u
    JOIN cargo c ON c.codigo = u.cargo_id
"#;

/// Principal record from database, with its role joined in.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub cpf: String,
    pub email: Option<String>,
    /// Argon2 PHC string.
    pub password: String,
    /// `DIRETA` or `INDIRETA`.
    pub rede: String,
    pub is_validado: bool,
    pub is_core_sso: bool,
    pub last_login: Option<OffsetDateTime>,
    pub cargo_codigo: i32,
    pub cargo_nome: String,
}

impl UserRow {
    fn from_tuple(row: UserTuple) -> Self {
        Self {
            id: row.0,
            username: row.1,
            name: row.2,
            cpf: row.3,
            email: row.4,
            password: row.5,
            rede: row.6,
            is_validado: row.7,
            is_core_sso: row.8,
            last_login: row.9,
            cargo_codigo: row.10,
            cargo_nome: row.11,
        }
    }
}

impl From<UserRow> for Principal {
    fn from(row: UserRow) -> Self {
        let network = row.rede.parse::<Network>().unwrap_or_else(|e| {
            tracing::warn!(id = %row.id, error = %e, "unexpected rede value, assuming DIRETA");
            Network::Direta
        });

        Principal {
            id: row.id,
            username: row.username,
            name: row.name,
            cpf: row.cpf,
            email: row.email,
            password_hash: row.password,
            role: Role::new(row.cargo_codigo, row.cargo_nome),
            network,
            is_validated: row.is_validado,
            is_externally_provisioned: row.is_core_sso,
            last_login: row.last_login,
        }
    }
}

// =============================================================================
// User Storage
// =============================================================================

/// Principal storage operations.
pub struct UserStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStorage<'a> {
    /// Create a new user storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a principal by login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_login(&self, username: &str) -> StorageResult<Option<UserRow>> {
        let row: Option<UserTuple> = query_as(&format!("{SELECT_USER} WHERE u.username = $1"))
            .bind(username)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(UserRow::from_tuple))
    }

    /// Find a principal by CPF.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_cpf(&self, cpf: &str) -> StorageResult<Option<UserRow>> {
        let row: Option<UserTuple> = query_as(&format!("{SELECT_USER} WHERE u.cpf = $1"))
            .bind(cpf)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(UserRow::from_tuple))
    }

    /// Find a principal by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<UserRow>> {
        let row: Option<UserTuple> = query_as(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(UserRow::from_tuple))
    }

    /// Insert a principal provisioned outside the login flow.
    ///
    /// The role must already exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the login or CPF is taken.
    pub async fn create(&self, principal: &Principal) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO usuario (id, username, name, cpf, email, password, cargo_id, rede,
                                 is_validado, is_core_sso, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(principal.id)
        .bind(&principal.username)
        .bind(&principal.name)
        .bind(&principal.cpf)
        .bind(principal.email.as_deref())
        .bind(&principal.password_hash)
        .bind(principal.role.codigo)
        .bind(principal.network.as_str())
        .bind(principal.is_validated)
        .bind(principal.is_externally_provisioned)
        .bind(principal.last_login)
        .execute(self.pool)
        .await
        .map_err(|e| StorageError::from_write(e, "usuario insert"))?;

        Ok(())
    }

    /// Upserts the role and the principal after a successful external login.
    ///
    /// Both writes run in one transaction keyed by the natural keys (role
    /// code, login). Concurrent logins for the same login are serialized by
    /// a transaction-scoped advisory lock and converge on one row; the last
    /// writer wins on the mirrored fields.
    ///
    /// # Errors
    ///
    /// - `StorageError::Conflict` on a unique violation (e.g. the CPF is bound
    ///   to another login)
    /// - `StorageError::Database` on any other failure
    pub async fn upsert_reconciled(&self, identity: &ReconciledIdentity) -> StorageResult<UserRow> {
        let mut tx = self.pool.begin().await?;

        // Concurrent first logins would otherwise both pass the username
        // arbiter check and trip the cpf unique index.
        query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&identity.username)
            .execute(&mut *tx)
            .await?;

        cargo::upsert_in(&mut tx, &identity.role).await?;

        let (id,): (Uuid,) = query_as(
            r#"
            INSERT INTO usuario (id, username, name, cpf, email, password, cargo_id,
                                 is_validado, is_core_sso, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, TRUE, NOW())
            ON CONFLICT (username) DO UPDATE SET
                name = EXCLUDED.name,
                cpf = EXCLUDED.cpf,
                email = EXCLUDED.email,
                password = EXCLUDED.password,
                cargo_id = EXCLUDED.cargo_id,
                is_validado = TRUE,
                is_core_sso = TRUE,
                last_login = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.username)
        .bind(&identity.name)
        .bind(&identity.cpf)
        .bind(identity.email.as_deref())
        .bind(&identity.password_hash)
        .bind(identity.role.codigo)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::from_write(e, "usuario upsert"))?;

        let row: UserTuple = query_as(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(UserRow::from_tuple(row))
    }

    /// Sets `last_login` to now.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no principal has this id.
    pub async fn record_login(&self, id: Uuid) -> StorageResult<()> {
        let result = query("UPDATE usuario SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("usuario {id}")));
        }
        Ok(())
    }

    /// Replaces the password hash.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no principal has this id.
    pub async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StorageResult<()> {
        let result = query("UPDATE usuario SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(format!("usuario {id}")));
        }
        Ok(())
    }
}
