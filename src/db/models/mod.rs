//! Database record structures for the RBAC tables.

pub mod permissions;
pub mod roles;
pub mod users;
