//! Request handlers for the HTTP API.

pub mod auth;
pub mod permissions;
pub mod roles;
pub mod users;
