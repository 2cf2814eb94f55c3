//! Storage layer for portfolio content.
//!
//! Handlers only see the [`Store`] trait. The server builds one store at
//! startup and shares it through `AppState`; tests substitute their own.

pub mod schema;
pub mod sqlite;

use async_trait::async_trait;

use crate::errors::Result;
use crate::normalize::Value;

pub use schema::{Column, ColumnKind, Entity};
pub use sqlite::SqliteStore;

/// How a single record is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(i64),
    Slug(String),
}

/// Restricts a listing to rows whose foreign key column equals `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub id: i64,
}

impl Filter {
    pub fn new(column: &'static str, id: i64) -> Self {
        Self { column, id }
    }
}

/// Column assignments for an update or insert, in column order.
pub type Changes = Vec<(&'static str, serde_json::Value)>;

/// Persistence operations the HTTP layer relies on.
#[async_trait]
pub trait Store: Send + Sync {
    /// All records of `entity`, optionally restricted by `filter`.
    async fn list(&self, entity: Entity, filter: Option<Filter>) -> Result<Vec<Value>>;

    /// One record, or `None` when nothing matches.
    async fn find(&self, entity: Entity, lookup: &Lookup) -> Result<Option<Value>>;

    /// Apply `changes` to the record with `id` and return the updated row.
    /// Returns `None` when the record does not exist.
    async fn update(&self, entity: Entity, id: i64, changes: &Changes) -> Result<Option<Value>>;

    /// Delete the record with `id`. Returns whether a row was removed.
    async fn delete(&self, entity: Entity, id: i64) -> Result<bool>;

    /// Insert a new record and return it as stored.
    async fn insert(&self, entity: Entity, changes: &Changes) -> Result<Value>;
}
