//! Repository implementations for the RBAC tables.

pub mod permissions;
pub mod repository;
pub mod roles;
pub mod users;

pub use permissions::Permissions;
pub use repository::Repository;
pub use roles::Roles;
pub use users::Users;
