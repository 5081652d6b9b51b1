//! Response assembly: one encoded text in, one wire-ready payload out.
//!
//! Runs the reduction/normalization/blending pipeline over an
//! [`Encoding`] and packages the result. Pure and synchronous — the
//! route wraps it in a blocking task.

use encoder::{Encoder, Encoding};
use projection::Point3;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::plot::{self, PlotData, AVAILABLE_COLORSCALES};

/// Seed for the stochastic reduction, fixed so the same text always maps
/// to the same layout.
const REDUCTION_SEED: u64 = 42;

/// Success payload for the visualize endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizeResponse {
    /// Visible tokens — boundary markers excluded.
    pub tokens: Vec<String>,
    /// Vocabulary ids for the full sequence, boundary markers included.
    pub token_ids: Vec<u32>,
    /// Normalized 3D coordinates, one row per token (full sequence).
    pub embeddings: Vec<Point3>,
    /// Raw hidden-state vectors, one row per token (full sequence).
    pub original_embeddings: Vec<Vec<f32>>,
    /// Blended attention matrix over the full sequence.
    pub attention_scores: Vec<Vec<f32>>,
    /// Scatter trace + layout, ready for the plotting client.
    pub plot_data: PlotData,
    pub technical_info: TechnicalInfo,
    /// Colorscales the client may apply without a new request.
    pub available_colorscales: Vec<String>,
}

/// Flat per-request metadata snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalInfo {
    pub input_text_length: usize,
    pub num_tokens: usize,
    /// `[rows, hidden_size]` of the raw embedding matrix.
    pub embedding_shape: [usize; 2],
    /// Reduction parameter for this token count (reported even when the
    /// linear fallback ran and did not use it).
    pub perplexity: f64,
    pub model_name: String,
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_attention_heads: usize,
    pub num_hidden_layers: usize,
}

/// Encode `text` and assemble the full visualization payload.
pub fn visualize_text(
    text: &str,
    encoder: &Encoder,
    config: &ServerConfig,
) -> ServerResult<VisualizeResponse> {
    let encoding = encoder.encode(text)?;
    if encoding.is_empty() {
        return Err(ServerError::Internal(
            "encoder produced an empty token sequence".into(),
        ));
    }
    let n = encoding.len();
    let perplexity = projection::perplexity_for(n);
    tracing::debug!(tokens = n, perplexity, "encoded request text");

    // --- Coordinates ---
    let mut coords = projection::reduce_to_3d(&encoding.hidden_states, REDUCTION_SEED)?;
    let replaced = projection::sanitize_in_place(&mut coords);
    if replaced > 0 {
        tracing::warn!(replaced, "replaced non-finite reduced coordinates with 0.0");
    }
    let scale = projection::rescale_in_place(&mut coords);
    if scale != 1.0 {
        tracing::debug!(scale, "rescaled coordinates into display range");
    }

    // --- Attention ---
    let raw_attention = select_layer(&encoding, &config.attention_layer);
    let attention_scores = projection::blend_attention(raw_attention);

    // --- Geometry + metadata ---
    let plot_data = plot::build_plot(&coords, &encoding.tokens);
    let technical_info = TechnicalInfo {
        input_text_length: text.chars().count(),
        num_tokens: n,
        embedding_shape: [n, encoding.hidden_size()],
        perplexity,
        model_name: encoder.model_name().to_string(),
        vocab_size: encoder.vocab_size(),
        hidden_size: encoding.hidden_size(),
        num_attention_heads: encoding.num_attention_heads,
        num_hidden_layers: encoding.num_layers(),
    };

    Ok(VisualizeResponse {
        tokens: visible_tokens(&encoding),
        token_ids: encoding.token_ids.clone(),
        embeddings: coords,
        original_embeddings: encoding.hidden_states,
        attention_scores,
        plot_data,
        technical_info,
        available_colorscales: AVAILABLE_COLORSCALES
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Tokens shown in the word list: everything between the boundary markers.
fn visible_tokens(encoding: &Encoding) -> Vec<String> {
    if encoding.len() < 2 {
        return Vec::new();
    }
    encoding.tokens[1..encoding.len() - 1].to_vec()
}

/// Resolve the attention layer policy against what the model returned.
fn select_layer<'a>(encoding: &'a Encoding, policy: &str) -> &'a [Vec<f32>] {
    let layer = match policy {
        "first" => encoding.attentions.first(),
        _ => encoding.attentions.last(),
    };
    layer.map(Vec::as_slice).unwrap_or(&[])
}
