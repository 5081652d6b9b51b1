//! tokenlens transformer adapter
//!
//! Wraps a pretrained transformer behind one small surface: text goes in,
//! and out comes everything the visualization pipeline needs — the token
//! strings (boundary markers included), their vocabulary ids, one hidden
//! state vector per token, and per-layer attention matrices already
//! averaged across heads.
//!
//! Two backends:
//!
//! - **ONNX mode** — a local model exported with hidden states and
//!   attentions as outputs, run through ONNX Runtime. The tokenizer comes
//!   from a `tokenizer.json` next to the model.
//! - **Stub mode** — deterministic fake outputs with the same shape
//!   guarantees. This is what tests (and model-less dev machines) run on.
//!
//! Unlike an embedding service there is no fallback between the two: if
//! ONNX mode is configured and the assets don't load, [`Encoder::load`]
//! fails and the process should refuse to serve.
//!
//! ## Threading notes
//!
//! The [`Encoder`] itself is `Send + Sync` and meant to be built once at
//! startup and shared behind an `Arc`. ONNX sessions are cached
//! per-thread; the first encode on any thread pays the session setup.

pub mod config;
pub mod error;
pub mod types;

mod onnx;
mod stub;

pub use crate::config::EncoderConfig;
pub use crate::error::EncodeError;
pub use crate::types::{AttentionMatrix, Encoding};

use tokenizers::Tokenizer;

enum Backend {
    /// Deterministic outputs for tests and model-less environments.
    Stub,
    /// Local inference through ONNX Runtime.
    Onnx { tokenizer: Tokenizer },
}

/// Loaded tokenizer + model pair. Construct once at process start, inject
/// wherever encoding is needed, drop at shutdown.
pub struct Encoder {
    config: EncoderConfig,
    backend: Backend,
}

impl Encoder {
    /// Load the configured backend. In ONNX mode this validates both
    /// assets up front — a missing or unparseable model is a startup
    /// failure, not something to paper over at request time.
    pub fn load(config: EncoderConfig) -> Result<Self, EncodeError> {
        match config.mode.as_str() {
            "stub" => {
                tracing::info!(model = %config.model_name, "encoder running in stub mode");
                Ok(Self {
                    backend: Backend::Stub,
                    config,
                })
            }
            "onnx" => {
                if !config.tokenizer_path.exists() {
                    return Err(EncodeError::TokenizerMissing(
                        config.tokenizer_path.display().to_string(),
                    ));
                }
                if !config.model_path.exists() {
                    return Err(EncodeError::ModelNotFound(
                        config.model_path.display().to_string(),
                    ));
                }
                let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
                    .map_err(|e| EncodeError::Inference(e.to_string()))?;
                // Build a session now so a broken model file fails the
                // process at startup; worker threads build theirs lazily.
                onnx::warm_session(&config.model_path)?;
                tracing::info!(
                    model = %config.model_name,
                    path = %config.model_path.display(),
                    "encoder model loaded"
                );
                Ok(Self {
                    backend: Backend::Onnx { tokenizer },
                    config,
                })
            }
            other => Err(EncodeError::InvalidConfig(format!(
                "unknown encoder mode '{other}' (expected \"onnx\" or \"stub\")"
            ))),
        }
    }

    /// Run `text` through the backend.
    pub fn encode(&self, text: &str) -> Result<Encoding, EncodeError> {
        match &self.backend {
            Backend::Stub => Ok(stub::stub_encoding(text)),
            Backend::Onnx { tokenizer } => onnx::encode_with_model(tokenizer, &self.config, text),
        }
    }

    /// Vocabulary size of the underlying tokenizer.
    pub fn vocab_size(&self) -> usize {
        match &self.backend {
            Backend::Stub => stub::STUB_VOCAB_SIZE,
            Backend::Onnx { tokenizer } => tokenizer.get_vocab_size(true),
        }
    }

    /// Display label of the configured model.
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Which backend is active (`"onnx"` or `"stub"`).
    pub fn mode(&self) -> &str {
        &self.config.mode
    }
}
