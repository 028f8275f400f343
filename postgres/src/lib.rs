//! `PostgreSQL` persistence for Complaint Desk.
//!
//! - [`PostgresAggregateStore`]: Restaurant aggregates as JSONB documents with
//!   a `version` column for optimistic concurrency and a complaint index kept
//!   in the same transaction
//! - [`PostgresNotifications`]: the notification queue (emitter and inbox)
//!
//! Both share one [`sqlx::PgPool`] created by the caller at startup.
//!
//! # Example
//!
//! ```ignore
//! use complaint_desk_postgres::{PostgresAggregateStore, migrate};
//!
//! async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     migrate(&pool).await?;
//!     let store = PostgresAggregateStore::from_pool(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregate_store;
mod notifications;

pub use aggregate_store::PostgresAggregateStore;
pub use notifications::PostgresNotifications;

use sqlx::PgPool;

const SCHEMA: &str = include_str!("../migrations/0001_complaint_desk.sql");

/// Create the tables and indexes if they do not exist yet.
///
/// # Errors
///
/// Returns the database error if any statement fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema is up to date");
    Ok(())
}
