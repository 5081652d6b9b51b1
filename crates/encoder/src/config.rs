use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which model to run and where its assets live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    /// Backend selector: `"onnx"` (local inference) or `"stub"`
    /// (deterministic fake outputs for tests and dev machines).
    pub mode: String,
    /// Friendly label surfaced in response metadata.
    pub model_name: String,
    /// Path to the ONNX model file. The export must include hidden states
    /// and per-layer attentions among its outputs.
    pub model_path: PathBuf,
    /// Path to the matching `tokenizer.json`.
    pub tokenizer_path: PathBuf,
    /// Sequences longer than this are truncated before inference.
    pub max_sequence_length: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_name: "bert-base-uncased".into(),
            model_path: PathBuf::from("./models/bert-base-uncased/model.onnx"),
            tokenizer_path: PathBuf::from("./models/bert-base-uncased/tokenizer.json"),
            max_sequence_length: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_bert_base() {
        let cfg = EncoderConfig::default();
        assert_eq!(cfg.mode, "onnx");
        assert_eq!(cfg.model_name, "bert-base-uncased");
        assert_eq!(cfg.max_sequence_length, 512);
        assert!(cfg.model_path.to_string_lossy().ends_with("model.onnx"));
        assert!(cfg
            .tokenizer_path
            .to_string_lossy()
            .ends_with("tokenizer.json"));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = EncoderConfig {
            mode: "stub".into(),
            model_name: "tiny".into(),
            model_path: PathBuf::from("/models/tiny.onnx"),
            tokenizer_path: PathBuf::from("/models/tiny-tokenizer.json"),
            max_sequence_length: 128,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EncoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
