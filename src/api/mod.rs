//! HTTP API layer: request handlers and their request/response models.

pub mod handlers;
pub mod models;
