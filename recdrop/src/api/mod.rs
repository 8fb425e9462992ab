//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response data structures
//!
//! # API Structure
//!
//! - `GET /health`: liveness probe
//! - `POST /upload`: multipart recording upload
//! - `GET /openapi.json`: OpenAPI document for the routes above
//!
//! Every route sits behind the CORS layer and the [`crate::guard`] middleware.

pub mod handlers;
pub mod models;
