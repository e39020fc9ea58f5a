//! Account store
//!
//! Owns user records. Email uniqueness is enforced inside `create` itself
//! (write lock in memory, unique index in PostgreSQL), so concurrent
//! registrations for the same email cannot both succeed.

use super::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use storefront_shared::{Role, User};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Account store capability set
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account; `Duplicate` if the email is taken
    async fn create(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError>;

    /// Exact, case-sensitive email match
    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError>;

    /// Replace the stored record with the same id; `NotFound` if absent
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// True iff at least one stored account has the admin role
    async fn has_admin(&self) -> Result<bool, RepositoryError>;
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
struct UserTables {
    users: HashMap<Uuid, User>,
    ids_by_email: HashMap<String, Uuid>,
}

/// In-memory account store
///
/// Reads share the lock; every mutation takes the write lock for the whole
/// check-and-insert.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<UserTables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.ids_by_email.contains_key(&user.email) || tables.users.contains_key(&user.id) {
            return Err(RepositoryError::Duplicate);
        }

        tables.ids_by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .ids_by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;

        let previous_email = match tables.users.get(&user.id) {
            Some(existing) => existing.email.clone(),
            None => return Err(RepositoryError::NotFound),
        };

        if previous_email != user.email {
            if tables.ids_by_email.contains_key(&user.email) {
                return Err(RepositoryError::Duplicate);
            }
            tables.ids_by_email.remove(&previous_email);
            tables.ids_by_email.insert(user.email.clone(), user.id);
        }

        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;

        let user = tables.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.ids_by_email.remove(&user.email);
        Ok(())
    }

    async fn has_admin(&self) -> Result<bool, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(User::is_admin))
    }
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// User row as stored; `role` is TEXT
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role: Role = record
            .role
            .parse()
            .map_err(|e| RepositoryError::Storage(anyhow::Error::new(e)))?;

        Ok(User {
            id: record.id,
            email: record.email,
            password_hash: record.password_hash,
            name: record.name,
            role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// PostgreSQL account store
///
/// Deletion is soft (`deleted_at`); deleted rows are invisible to every
/// lookup and free their email for reuse through a partial unique index.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, name, role, created_at, updated_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        record.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, password_hash, name, role, created_at, updated_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        record.try_into()
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, name = $4, role = $5, updated_at = $6
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn has_admin(&self) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE role = 'admin' AND deleted_at IS NULL
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
