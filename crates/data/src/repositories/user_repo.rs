//! Login identities in `auth.users`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solomon_core::{UserCredentials, UserDirectory};
use sqlx::PgPool;

pub const SELECT_USER_BY_EMAIL_SQL: &str = r#"
    SELECT id::BIGINT, email, password_hash
    FROM auth.users
    WHERE email = $1
"#;

/// Inserts the user only when the email is not taken yet.
pub const CREATE_USER_IF_ABSENT_SQL: &str = r#"
    INSERT INTO auth.users (email, password_hash)
    SELECT $1, $2
    WHERE NOT EXISTS (SELECT 1 FROM auth.users WHERE email = $1)
"#;

/// Repository for `auth.users`.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks up a user by exact email.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(SELECT_USER_BY_EMAIL_SQL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("user lookup failed")?;

        Ok(row.map(|(id, email, password_hash)| UserCredentials {
            id,
            email,
            password_hash,
        }))
    }

    /// Creates the user unless one with the same email exists. Returns
    /// whether a row was inserted.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn create_if_absent(&self, email: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(CREATE_USER_IF_ABSENT_SQL)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .context("user insert failed")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.find_by_email(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_binds_email() {
        assert!(SELECT_USER_BY_EMAIL_SQL.contains("WHERE email = $1"));
        assert!(!SELECT_USER_BY_EMAIL_SQL.contains('\''));
    }

    #[test]
    fn test_create_is_guarded_by_existence_check() {
        let sql = CREATE_USER_IF_ABSENT_SQL;
        assert!(sql.contains("INSERT INTO auth.users (email, password_hash)"));
        assert!(sql.contains("WHERE NOT EXISTS (SELECT 1 FROM auth.users WHERE email = $1)"));
    }
}
