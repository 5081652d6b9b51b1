use once_cell::sync::OnceCell;
use onnxruntime::ndarray::{Array, Array2};
use onnxruntime::{environment::Environment, session::Session};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokenizers::Tokenizer;

use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::types::{AttentionMatrix, Encoding};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

thread_local! {
    static SESSION_CACHE: RefCell<HashMap<PathBuf, Rc<RefCell<Session<'static>>>>> =
        RefCell::new(HashMap::new());
}

/// Build (and cache) a session for `model_path` on the current thread.
/// Called at startup so a broken model file fails loading, not a request.
pub(crate) fn warm_session(model_path: &Path) -> Result<(), EncodeError> {
    session_handle(model_path).map(|_| ())
}

fn session_handle(model_path: &Path) -> Result<Rc<RefCell<Session<'static>>>, EncodeError> {
    SESSION_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(model_path) {
            return Ok(handle.clone());
        }

        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| EncodeError::Inference(e.to_string()))?
            .with_model_from_file(model_path.to_path_buf())
            .map_err(|e| EncodeError::Inference(e.to_string()))?;
        let handle = Rc::new(RefCell::new(session));
        cache.insert(model_path.to_path_buf(), handle.clone());
        Ok(handle)
    })
}

fn ort_environment() -> Result<&'static Environment, EncodeError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("encoder")
            .build()
            .map_err(|e| EncodeError::Inference(e.to_string()))
    })
}

/// Tokenize `text` and run one forward pass, collecting hidden states and
/// per-layer head-averaged attention.
pub(crate) fn encode_with_model(
    tokenizer: &Tokenizer,
    cfg: &EncoderConfig,
    text: &str,
) -> Result<Encoding, EncodeError> {
    // --- Tokenization ---
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| EncodeError::Inference(e.to_string()))?;
    let mut tokens: Vec<String> = encoding.get_tokens().to_vec();
    let mut ids: Vec<u32> = encoding.get_ids().to_vec();
    let mut mask: Vec<u32> = encoding.get_attention_mask().to_vec();
    if ids.len() != tokens.len() || ids.len() != mask.len() {
        return Err(EncodeError::Inference(
            "tokenizer produced mismatched token/id/mask lengths".into(),
        ));
    }
    if ids.len() > cfg.max_sequence_length {
        tokens.truncate(cfg.max_sequence_length);
        ids.truncate(cfg.max_sequence_length);
        mask.truncate(cfg.max_sequence_length);
    }
    if ids.is_empty() {
        return Err(EncodeError::Inference("tokenizer produced no tokens".into()));
    }
    let seq_len = ids.len();

    let input_ids = Array::from_shape_vec(
        (1, seq_len),
        ids.iter().map(|&x| i64::from(x)).collect(),
    )
    .map_err(|e| EncodeError::Inference(e.to_string()))?;
    let attn_mask = Array::from_shape_vec(
        (1, seq_len),
        mask.iter().map(|&x| i64::from(x)).collect(),
    )
    .map_err(|e| EncodeError::Inference(e.to_string()))?;

    // --- Inference ---
    let handle = session_handle(&cfg.model_path)?;
    let mut guard = handle.borrow_mut();
    let session_ref = &mut *guard;
    let runtime_inputs = build_runtime_inputs(session_ref, input_ids, attn_mask, seq_len)?;
    let outputs = session_ref
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| EncodeError::Inference(e.to_string()))?;

    // --- Output extraction ---
    // The export's output order is not pinned down, so classify by shape:
    // rank-3 [1, seq, hidden] is the hidden-state matrix, every rank-4
    // [1, heads, seq, seq] is one layer's attention. Anything else (e.g.
    // a pooled sentence vector) is ignored.
    let mut hidden_states: Option<Vec<Vec<f32>>> = None;
    let mut attentions: Vec<AttentionMatrix> = Vec::new();
    let mut num_attention_heads = 0usize;

    for tensor in &outputs {
        let shape: Vec<usize> = tensor.shape().to_vec();
        let flat: Vec<f32> = tensor.iter().copied().collect();
        match shape.as_slice() {
            [1, s, hidden] if *s == seq_len => {
                if hidden_states.is_none() {
                    hidden_states =
                        Some(flat.chunks(*hidden).map(<[f32]>::to_vec).collect());
                }
            }
            [1, heads, s1, s2] if *s1 == seq_len && *s2 == seq_len => {
                num_attention_heads = *heads;
                attentions.push(mean_over_heads(&flat, *heads, seq_len));
            }
            _ => {
                tracing::debug!(?shape, "skipping unrecognized model output");
            }
        }
    }
    drop(outputs);

    let hidden_states = hidden_states.ok_or_else(|| {
        EncodeError::Inference("model did not return per-token hidden states".into())
    })?;
    if attentions.is_empty() {
        return Err(EncodeError::Inference(
            "model did not return attention weights; re-export it with attentions enabled".into(),
        ));
    }

    tracing::debug!(
        tokens = seq_len,
        hidden_size = hidden_states[0].len(),
        layers = attentions.len(),
        heads = num_attention_heads,
        "encoded text"
    );

    Ok(Encoding {
        tokens,
        token_ids: ids,
        hidden_states,
        attentions,
        num_attention_heads,
    })
}

fn build_runtime_inputs(
    session: &Session<'static>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
    seq_len: usize,
) -> Result<Vec<onnxruntime::ndarray::ArrayD<i64>>, EncodeError> {
    let mut runtime_inputs = Vec::with_capacity(session.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);

    for input in &session.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    EncodeError::InvalidConfig("model requested `input_ids` multiple times".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attn_mask_tensor.take().ok_or_else(|| {
                    EncodeError::InvalidConfig(
                        "model requested `attention_mask` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                let tensor = Array::from_elem((1, seq_len), 0_i64);
                runtime_inputs.push(tensor.into_dyn());
            }
            other => {
                return Err(EncodeError::Inference(format!(
                    "unsupported model input '{other}'"
                )))
            }
        }
    }

    if runtime_inputs.is_empty() {
        return Err(EncodeError::Inference(
            "model did not declare any inputs".into(),
        ));
    }
    Ok(runtime_inputs)
}

/// Average a flat `[heads, seq, seq]` attention block into one `seq x seq`
/// matrix.
fn mean_over_heads(flat: &[f32], heads: usize, seq_len: usize) -> AttentionMatrix {
    let per_head = seq_len * seq_len;
    let mut mean = vec![vec![0.0f32; seq_len]; seq_len];
    for head in 0..heads {
        let block = &flat[head * per_head..(head + 1) * per_head];
        for i in 0..seq_len {
            for j in 0..seq_len {
                mean[i][j] += block[i * seq_len + j];
            }
        }
    }
    let scale = 1.0 / heads as f32;
    for row in &mut mean {
        for value in row {
            *value *= scale;
        }
    }
    mean
}
