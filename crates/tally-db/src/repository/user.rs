//! # User Repository
//!
//! Display names for staff rows. Optional: without a `users` table the
//! reports show ids only.

use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::DbResult;
use crate::schema::SchemaCapabilities;

/// Repository for `users`.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// `user id → display name` for a company.
    pub async fn names(
        &self,
        company_id: &str,
        caps: &SchemaCapabilities,
    ) -> DbResult<HashMap<String, String>> {
        let name_column = ["full_name", "name", "username"]
            .into_iter()
            .find(|col| caps.has_column("users", col));
        let Some(name_column) = name_column else {
            return Ok(HashMap::new());
        };

        let sql = format!(
            "SELECT CAST(id AS TEXT), CAST({name_column} AS TEXT) FROM users \
             WHERE company_id = ?1 AND {name_column} IS NOT NULL"
        );
        let rows: Vec<(String, String)> = sqlx::query_as(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_names() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, company_id, full_name) VALUES ('u-1', 'c-1', 'Ada'), ('u-2', 'c-2', 'Bob')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let caps = db.capabilities().await.unwrap();
        let names = db.users().names("c-1", &caps).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names.get("u-1").map(String::as_str), Some("Ada"));
    }
}
