use serde::{Deserialize, Serialize};

/// One layer's attention, already averaged across heads: `scores[i][j]` is
/// the attention token `i` pays to token `j`.
pub type AttentionMatrix = Vec<Vec<f32>>;

/// Everything the model produced for one input text.
///
/// All per-token fields share the same length and order, boundary markers
/// included at both ends; every attention matrix is square with that
/// dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Encoding {
    /// Token strings, boundary markers at positions 0 and `len - 1`.
    pub tokens: Vec<String>,
    /// Vocabulary ids, aligned with `tokens`.
    pub token_ids: Vec<u32>,
    /// One hidden-state vector per token (`len x hidden_size`).
    pub hidden_states: Vec<Vec<f32>>,
    /// Head-averaged attention per layer, ordered shallow to deep.
    pub attentions: Vec<AttentionMatrix>,
    /// Head count of the model (before averaging), kept for metadata.
    pub num_attention_heads: usize,
}

impl Encoding {
    /// Full token count, boundary markers included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Width of the hidden-state vectors (0 for an empty encoding).
    pub fn hidden_size(&self) -> usize {
        self.hidden_states.first().map_or(0, Vec::len)
    }

    /// Number of transformer layers that reported attention.
    pub fn num_layers(&self) -> usize {
        self.attentions.len()
    }
}
