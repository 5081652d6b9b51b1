use std::io;
use thiserror::Error;

/// Errors surfaced while loading the encoder or running inference.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The ONNX model file does not exist at the configured path.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// The tokenizer JSON does not exist at the configured path.
    #[error("tokenizer missing: {0}")]
    TokenizerMissing(String),
    /// Configuration is inconsistent (e.g., an unknown mode).
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime or tokenizer failures during loading or inference.
    #[error("inference failure: {0}")]
    Inference(String),
}
