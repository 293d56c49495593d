//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx over the
//! embedded SQLite driver. It follows the Repository pattern to provide
//! clean abstractions over database operations.
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD and join-table operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Repository Pattern
//!
//! The [`handlers`] module provides a repository per table (Users, Roles,
//! Permissions). Repositories encapsulate all database access for a
//! specific entity type, and always operate on a `&mut SqliteConnection` —
//! create them from a transaction when an operation spans statements:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Users::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! Join mutations (role assignment, permission grants) are single
//! statements whose uniqueness and referential checks are enforced by the
//! store's composite primary keys and foreign keys, so concurrent
//! duplicate assignments cannot produce two rows.
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory. The [`crate::migrator`] function provides access to the migrator.

pub mod errors;
pub mod handlers;
pub mod models;
