//! Turns a prompt into a continuation using a loaded model.

use crate::error::ApiError;
use crate::model::{LoadedModel, SamplingParams, TokenId};
use anyhow::{anyhow, Context};
use std::sync::Arc;
use std::time::Instant;

/// Used when a model does not report its trained context size.
pub const DEFAULT_MAX_POSITIONS: usize = 1024;
pub const NO_REPEAT_NGRAM_SIZE: usize = 2;
pub const REPETITION_PENALTY: f32 = 1.1;

pub fn length_ceiling(input_len: usize, max_tokens: usize, max_positions: Option<usize>) -> usize {
    input_len.saturating_add(max_tokens).min(max_positions.unwrap_or(DEFAULT_MAX_POSITIONS))
}

/// Tokens that would complete an n-gram already present in `history`.
pub fn banned_ngram_tokens(history: &[TokenId], n: usize) -> Vec<TokenId> {
    if n == 0 || history.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &history[history.len() + 1 - n..];
    let mut banned: Vec<TokenId> = history
        .windows(n)
        .filter(|w| &w[..n - 1] == prefix)
        .map(|w| w[n - 1])
        .collect();
    banned.sort_unstable();
    banned.dedup();
    banned
}

/// Drops the prompt's characters from the front of the decoded output.
pub fn isolate_continuation(decoded: &str, prompt: &str) -> String {
    let skip = prompt.chars().count();
    let rest: String = decoded.chars().skip(skip).collect();
    rest.trim().to_string()
}

/// Blocking generation. Returns the trimmed continuation.
pub fn generate_blocking(
    handle: &LoadedModel,
    prompt: &str,
    temperature: f32,
    max_tokens: usize,
) -> anyhow::Result<String> {
    let model = handle.model.as_ref();
    let input = model.encode(prompt).context("encode prompt")?;
    let eos = model.eos_token_id();
    let params = SamplingParams {
        max_length: length_ceiling(input.len(), max_tokens, model.max_position_embeddings()),
        num_return_sequences: 1,
        temperature,
        do_sample: temperature > 0.0,
        pad_token_id: model.pad_token_id().unwrap_or(eos),
        eos_token_id: eos,
        no_repeat_ngram_size: NO_REPEAT_NGRAM_SIZE,
        repetition_penalty: REPETITION_PENALTY,
        early_stopping: true,
    };
    tracing::debug!(model = %handle.id, input_tokens = input.len(), max_length = params.max_length, "generating");

    let output = model.generate(&input, &params).context("generate")?;
    let decoded = model.decode(&output).context("decode output")?;
    tracing::debug!(model = %handle.id, output = %decoded, "full model output");
    Ok(isolate_continuation(&decoded, prompt))
}

/// Runs [`generate_blocking`] on the blocking pool. The handle is held for the
/// whole call, so an unload in the meantime only takes effect afterwards.
pub async fn generate(
    handle: Arc<LoadedModel>,
    prompt: String,
    temperature: f32,
    max_tokens: usize,
) -> Result<String, ApiError> {
    let model_id = handle.id.clone();
    let started = Instant::now();
    let out = tokio::task::spawn_blocking(move || generate_blocking(&handle, &prompt, temperature, max_tokens))
        .await
        .map_err(|e| ApiError::Generation(anyhow!("generation task failed: {e}")))?
        .map_err(ApiError::Generation)?;
    metrics::histogram!("generation_seconds", "model" => model_id).record(started.elapsed().as_secs_f64());
    Ok(out)
}
