use crate::assemble::{self, VisualizeResponse};
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Request to visualize one text
#[derive(Debug, Deserialize)]
pub struct VisualizeRequest {
    /// Input text (a missing field reads as empty and is rejected)
    #[serde(default)]
    pub text: String,
}

/// Tokenize the text, run inference, reduce embeddings to 3D, and return
/// the scatter geometry, blended attention matrix, and model metadata.
///
/// Validation happens before any model work: an empty `text` never
/// reaches the encoder. Everything after that runs on a blocking thread —
/// inference and reduction are CPU-bound and can take a while on long
/// inputs.
pub async fn visualize(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<VisualizeRequest>,
) -> ServerResult<Json<VisualizeResponse>> {
    if request.text.is_empty() {
        return Err(ServerError::EmptyText);
    }

    metrics::counter!("visualize_requests_total").increment(1);
    let start = Instant::now();

    let text = request.text;
    let worker_state = state.clone();
    let response = tokio::task::spawn_blocking(move || {
        assemble::visualize_text(&text, &worker_state.encoder, &worker_state.config)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("visualization task failed: {e}")))??;

    metrics::histogram!("visualize_duration_seconds").record(start.elapsed().as_secs_f64());
    tracing::info!(
        tokens = response.technical_info.num_tokens,
        duration_ms = start.elapsed().as_millis() as u64,
        "visualization complete"
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_field_deserializes_to_empty() {
        let request: VisualizeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.text.is_empty());
    }

    #[test]
    fn text_field_is_read() {
        let request: VisualizeRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(request.text, "hi");
    }
}
