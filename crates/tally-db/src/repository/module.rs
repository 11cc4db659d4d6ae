//! # Module Gate Repository
//!
//! Per-company feature flags. A company with no row for a module, or a
//! database without the `company_modules` table, has the module enabled.

use sqlx::SqlitePool;
use tracing::debug;

use tally_core::types::{ModuleKey, ModuleSet};

use crate::error::{DbError, DbResult};
use crate::schema::SchemaCapabilities;

/// Repository for `company_modules`.
#[derive(Debug, Clone)]
pub struct ModuleRepository {
    pool: SqlitePool,
}

impl ModuleRepository {
    /// Creates a new ModuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ModuleRepository { pool }
    }

    /// Whether one module is enabled for a company.
    pub async fn is_enabled(&self, company_id: &str, key: ModuleKey) -> DbResult<bool> {
        let enabled: Result<Option<i64>, DbError> = sqlx::query_scalar(
            "SELECT enabled FROM company_modules WHERE company_id = ?1 AND module_key = ?2",
        )
        .bind(company_id)
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from);

        match enabled {
            Ok(flag) => Ok(flag.map_or(true, |f| f != 0)),
            Err(DbError::MissingTable(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Resolves every module flag for a company in one query.
    pub async fn enabled_modules(
        &self,
        company_id: &str,
        caps: &SchemaCapabilities,
    ) -> DbResult<ModuleSet> {
        let mut modules = ModuleSet::all();
        if !caps.has_table("company_modules") {
            return Ok(modules);
        }

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT CAST(module_key AS TEXT), COALESCE(enabled, 1) FROM company_modules WHERE company_id = ?1",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        for (raw_key, enabled) in rows {
            if let Some(key) = ModuleKey::ALL.into_iter().find(|k| k.as_str() == raw_key) {
                modules.set(key, enabled != 0);
            }
        }

        debug!(company_id, ?modules, "Resolved module flags");
        Ok(modules)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_module_flags() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO company_modules (company_id, module_key, enabled) VALUES \
             ('c-1', 'swaps', 0), ('c-1', 'repairs', 1), ('c-1', 'loyalty', 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let caps = db.capabilities().await.unwrap();
        let modules = db.modules().enabled_modules("c-1", &caps).await.unwrap();
        assert!(!modules.swaps);
        assert!(modules.repairs);
        assert!(modules.inventory);

        assert!(!db.modules().is_enabled("c-1", ModuleKey::Swaps).await.unwrap());
        assert!(db.modules().is_enabled("c-2", ModuleKey::Swaps).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_table_enables_everything() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let caps = db.capabilities().await.unwrap();

        assert_eq!(db.modules().enabled_modules("c-1", &caps).await.unwrap(), ModuleSet::all());
        assert!(db.modules().is_enabled("c-1", ModuleKey::Repairs).await.unwrap());
    }
}
