//! API response data models.
//!
//! All models are annotated with `utoipa` for the generated OpenAPI document.

pub mod health;
pub mod upload;
