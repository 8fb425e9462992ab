use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness response, always `{"ok": true}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}
