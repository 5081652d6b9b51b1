use fxhash::hash64;

use crate::types::{AttentionMatrix, Encoding};

/// Vocabulary size reported in stub mode (bert-base-uncased's, so the
/// metadata looks like the real thing).
pub(crate) const STUB_VOCAB_SIZE: usize = 30522;

const STUB_HIDDEN_SIZE: usize = 128;
const STUB_LAYERS: usize = 2;
const STUB_HEADS: usize = 4;

const CLS_ID: u32 = 101;
const SEP_ID: u32 = 102;

/// Deterministic stand-in for the ONNX backend: whitespace tokens wrapped
/// in `[CLS]`/`[SEP]`, hash-derived ids, sinusoid hidden states, and
/// softmaxed hash-derived attention rows. Same shape guarantees as real
/// inference, reproducible across runs and platforms.
pub(crate) fn stub_encoding(text: &str) -> Encoding {
    let mut tokens = vec!["[CLS]".to_string()];
    tokens.extend(
        text.split_whitespace()
            .map(|word| word.to_lowercase()),
    );
    tokens.push("[SEP]".to_string());
    let n = tokens.len();

    let token_ids: Vec<u32> = tokens
        .iter()
        .enumerate()
        .map(|(pos, token)| {
            if pos == 0 {
                CLS_ID
            } else if pos == n - 1 {
                SEP_ID
            } else {
                // Stay clear of the special-token range.
                1000 + (hash64(token.as_bytes()) % (STUB_VOCAB_SIZE as u64 - 1000)) as u32
            }
        })
        .collect();

    // Position-salted sinusoids so repeated words still get distinct rows.
    let hidden_states: Vec<Vec<f32>> = tokens
        .iter()
        .enumerate()
        .map(|(pos, token)| {
            let h = hash64(format!("{pos}:{token}").as_bytes());
            (0..STUB_HIDDEN_SIZE)
                .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001 + idx as f32 * 0.01).sin())
                .collect()
        })
        .collect();

    let attentions: Vec<AttentionMatrix> = (0..STUB_LAYERS)
        .map(|layer| {
            (0..n)
                .map(|i| {
                    let scores: Vec<f32> = (0..n)
                        .map(|j| {
                            let h = hash64(format!("{layer}:{i}:{j}:{text}").as_bytes());
                            (h % 1000) as f32 / 1000.0
                        })
                        .collect();
                    softmax(&scores)
                })
                .collect()
        })
        .collect();

    Encoding {
        tokens,
        token_ids,
        hidden_states,
        attentions,
        num_attention_heads: STUB_HEADS,
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_markers_bracket_the_sequence() {
        let enc = stub_encoding("one two three");
        assert_eq!(enc.tokens.len(), 5);
        assert_eq!(enc.tokens[0], "[CLS]");
        assert_eq!(enc.tokens[4], "[SEP]");
        assert_eq!(enc.token_ids[0], CLS_ID);
        assert_eq!(enc.token_ids[4], SEP_ID);
    }

    #[test]
    fn empty_text_still_produces_markers() {
        let enc = stub_encoding("");
        assert_eq!(enc.tokens, vec!["[CLS]".to_string(), "[SEP]".to_string()]);
    }

    #[test]
    fn words_are_lowercased() {
        let enc = stub_encoding("Hello WORLD");
        assert_eq!(enc.tokens[1], "hello");
        assert_eq!(enc.tokens[2], "world");
    }

    #[test]
    fn attention_rows_are_probability_rows() {
        let enc = stub_encoding("a b c d");
        for layer in &enc.attentions {
            for row in layer {
                let sum: f32 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
                assert!(row.iter().all(|v| *v >= 0.0));
            }
        }
    }

    #[test]
    fn repeated_words_get_distinct_hidden_rows() {
        let enc = stub_encoding("again again");
        assert_ne!(enc.hidden_states[1], enc.hidden_states[2]);
    }

    #[test]
    fn word_ids_avoid_the_special_range() {
        let enc = stub_encoding("alpha beta");
        for &id in &enc.token_ids[1..enc.token_ids.len() - 1] {
            assert!(id >= 1000);
            assert!((id as usize) < STUB_VOCAB_SIZE);
        }
    }

    #[test]
    fn stub_shapes_are_consistent() {
        let enc = stub_encoding("the cat sat");
        let n = enc.len();
        assert_eq!(enc.hidden_states.len(), n);
        assert_eq!(enc.hidden_size(), STUB_HIDDEN_SIZE);
        assert_eq!(enc.num_layers(), STUB_LAYERS);
        assert_eq!(enc.num_attention_heads, STUB_HEADS);
        for layer in &enc.attentions {
            assert_eq!(layer.len(), n);
        }
    }

    #[test]
    fn unicode_words_tokenize() {
        let enc = stub_encoding("héllo 世界");
        assert_eq!(enc.tokens.len(), 4);
    }
}
