//! Storage access behind traits.
//!
//! Reads go through [`Store`] directly. Writes go through a [`UnitOfWork`]
//! obtained from [`Store::begin`]: nothing is visible to other requests until
//! [`UnitOfWork::commit`], and dropping an uncommitted unit of work discards
//! every write made through it.
//!
//! Two backends implement these traits:
//!
//! - [`postgres::PgStore`]: sqlx transactions on a PostgreSQL pool
//! - [`memory::MemoryStore`]: in-process state for tests

use async_trait::async_trait;

use crate::error::AppError;

pub mod actors;
pub mod catalog;
pub mod memory;
pub mod orders;
pub mod postgres;

pub use actors::{ActorRepository, ActorWriter};
pub use catalog::{CatalogRepository, CatalogWriter};
pub use orders::{OrderRepository, OrderWriter};

/// Read access to every table plus the entry point for writes.
#[async_trait]
pub trait Store: ActorRepository + CatalogRepository + OrderRepository {
    /// Start an all-or-nothing unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    /// Connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Writes belonging to one use case.
#[async_trait]
pub trait UnitOfWork: ActorWriter + CatalogWriter + OrderWriter {
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
