//! HTTP request handlers.
//!
//! - [`health`]: constant liveness response
//! - [`upload`]: recording upload, validation and storage

pub mod health;
pub mod upload;
