//! Tool listing endpoint.

use axum::Json;
use maestro_core::tools::{builtin_tools, ToolMetadata};

/// List tool definitions. Confidence thresholds are advisory metadata.
pub async fn list_tools() -> Json<Vec<ToolMetadata>> {
    Json(builtin_tools())
}
