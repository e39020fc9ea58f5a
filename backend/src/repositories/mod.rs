//! Data access layer
//!
//! Each store is a capability trait with an in-memory and a PostgreSQL
//! implementation; services only ever see `Arc<dyn ...Repository>`.

pub mod product;
pub mod user;

pub use product::{InMemoryProductRepository, PgProductRepository, ProductRepository};
pub use user::{InMemoryUserRepository, PgUserRepository, UserRepository};

use thiserror::Error;

/// Failure modes shared by every store
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record violates a uniqueness constraint")]
    Duplicate,

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            err if is_unique_violation(&err) => RepositoryError::Duplicate,
            err => RepositoryError::Storage(err.into()),
        }
    }
}

/// SQLSTATE 23505
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
