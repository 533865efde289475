//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled into the binary and applied
//! through the sqlx migrator, which records them in `_sqlx_migrations`.
//!
//! To add a migration, create the SQL file and append an entry to
//! `embedded_migrations!`.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use tracing::{info, instrument};

use crate::{PgPool, StorageError, StorageResult};

macro_rules! embedded_migrations {
    () => {
        &[(
            20250301000001i64,
            "initial_schema",
            include_str!("../migrations/20250301000001_initial_schema.sql"),
        )]
    };
}

fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Number of embedded migrations.
#[must_use]
pub fn count() -> usize {
    embedded_migrations!().len()
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns `StorageError::Migration` if a migration fails to apply.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> StorageResult<()> {
    let migrator = Migrator {
        migrations: Cow::Owned(build_migrations()),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    info!(count = migrator.migrations.len(), "Running database migrations");

    migrator
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))?;

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_non_empty() {
        let migrations = build_migrations();
        assert_eq!(migrations.len(), count());
        assert!(
            migrations
                .windows(2)
                .all(|pair| pair[0].version < pair[1].version)
        );
        assert!(migrations.iter().all(|m| !m.sql.trim().is_empty()));
        assert!(migrations[0].sql.contains("CREATE TABLE IF NOT EXISTS usuario"));
    }
}
