// llama.cpp runtime via `llama-cpp-2`.
use super::{LanguageModel, MemoryFootprint, ModelRuntime, SamplingParams, TokenId};
use crate::config::Config;
use crate::device::{Capabilities, Device};
use crate::generate::banned_ngram_tokens;
use crate::util;
use anyhow::{ensure, Context, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend as LLBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::token::data_array::LlamaTokenDataArray;
use llama_cpp_2::token::LlamaToken;
use llama_cpp_2::{send_logs_to_tracing, LogOptions};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Inner {
    backend: LLBackend,
    models_dir: PathBuf,
    n_gpu_layers: u32,
    n_batch: u32,
    n_threads: i32,
    repeat_last_n: i32,
}

#[derive(Clone)]
pub struct LlamaRuntime {
    inner: Arc<Inner>,
}

impl LlamaRuntime {
    pub fn new(cfg: &Config) -> Result<Self> {
        // route llama.cpp logs to tracing so they appear in server logs when RUST_LOG is set
        send_logs_to_tracing(LogOptions::default());

        let backend = LLBackend::init().context("init llama backend")?;
        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                models_dir: cfg.models_dir.clone(),
                n_gpu_layers: cfg.n_gpu_layers,
                n_batch: cfg.n_batch.max(1),
                n_threads: cfg.threads(),
                repeat_last_n: cfg.repeat_last_n,
            }),
        })
    }
}

#[async_trait::async_trait]
impl ModelRuntime for LlamaRuntime {
    fn capabilities(&self) -> Capabilities {
        let offload = self.inner.backend.supports_gpu_offload();
        Capabilities {
            cuda: offload && cfg!(feature = "cuda"),
            metal: offload && cfg!(feature = "metal"),
        }
    }

    async fn load(&self, identifier: &str, device: Device) -> Result<Box<dyn LanguageModel>> {
        let inner = self.inner.clone();
        let identifier = identifier.to_string();
        let engine = tokio::task::spawn_blocking(move || LlamaEngine::load(inner, &identifier, device))
            .await
            .context("model load task")??;
        Ok(Box::new(engine))
    }
}

pub struct LlamaEngine {
    // dropped before `runtime` so the model is freed while the backend is alive
    model: LlamaModel,
    runtime: Arc<Inner>,
    file_size: u64,
}

impl LlamaEngine {
    fn load(runtime: Arc<Inner>, identifier: &str, device: Device) -> Result<Self> {
        let path = util::resolve_model_file(&runtime.models_dir, identifier)?;
        let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let mut model_params = LlamaModelParams::default();
        if device.is_accelerator() && runtime.n_gpu_layers > 0 {
            model_params = model_params.with_n_gpu_layers(runtime.n_gpu_layers);
        }

        tracing::info!(model = identifier, path = %path.display(), %device, "reading weights");
        let model = LlamaModel::load_from_file(&runtime.backend, &path, &model_params)
            .with_context(|| format!("load GGUF model {}", path.display()))?;

        Ok(Self { model, runtime, file_size })
    }

    fn build_sampler(&self, params: &SamplingParams) -> LlamaSampler {
        let mut samplers = vec![LlamaSampler::penalties(
            self.runtime.repeat_last_n,
            params.repetition_penalty,
            0.0,
            0.0,
        )];
        if params.do_sample {
            samplers.push(LlamaSampler::temp(params.temperature));
            samplers.push(LlamaSampler::dist(rand::random::<u32>()));
        } else {
            samplers.push(LlamaSampler::greedy());
        }
        LlamaSampler::chain_simple(samplers)
    }
}

impl LanguageModel for LlamaEngine {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let tokens = self
            .model
            .str_to_token(text, AddBos::Always)
            .context("tokenize prompt")?;
        Ok(tokens.into_iter().map(|t| t.0).collect())
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        let pieces = tokens
            .iter()
            .map(|&t| self.model.token_to_bytes(LlamaToken(t), Special::Plaintext))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(util::decode_utf8_pieces(&pieces))
    }

    fn eos_token_id(&self) -> TokenId {
        self.model.token_eos().0
    }

    fn max_position_embeddings(&self) -> Option<usize> {
        match self.model.n_ctx_train() {
            0 => None,
            n => Some(n as usize),
        }
    }

    fn generate(&self, input: &[TokenId], params: &SamplingParams) -> Result<Vec<TokenId>> {
        ensure!(params.num_return_sequences == 1, "only one return sequence is supported");
        ensure!(!input.is_empty(), "empty prompt");

        let mut sequence = input.to_vec();
        if sequence.len() >= params.max_length {
            return Ok(sequence);
        }

        // Fresh context per request; sized to exactly the allowed sequence length.
        let n_batch = self.runtime.n_batch;
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(params.max_length as u32))
            .with_n_batch(n_batch)
            .with_n_threads(self.runtime.n_threads)
            .with_n_threads_batch(self.runtime.n_threads);
        let mut ctx = self
            .model
            .new_context(&self.runtime.backend, ctx_params)
            .context("create llama context")?;

        let mut sampler = self.build_sampler(params);

        // Prefill in n_batch chunks; logits only for the very last prompt token.
        let mut batch = LlamaBatch::new(n_batch as usize, 1);
        let last_index = input.len() - 1;
        for (chunk_no, chunk) in input.chunks(n_batch as usize).enumerate() {
            batch.clear();
            for (j, &t) in chunk.iter().enumerate() {
                let pos = chunk_no * n_batch as usize + j;
                batch.add(LlamaToken(t), pos as i32, &[0], pos == last_index)?;
            }
            ctx.decode(&mut batch).context("decode prompt")?;
        }
        for &t in input {
            sampler.accept(LlamaToken(t));
        }

        let eos = LlamaToken(params.eos_token_id);
        while sequence.len() < params.max_length {
            let mut candidates = LlamaTokenDataArray::from_iter(ctx.candidates_ith(batch.n_tokens() - 1), false);
            for banned in banned_ngram_tokens(&sequence, params.no_repeat_ngram_size) {
                if let Some(d) = candidates.data.iter_mut().find(|d| d.id().0 == banned) {
                    d.set_logit(f32::NEG_INFINITY);
                }
            }
            candidates.apply_sampler(&sampler);
            let token = candidates.selected_token().context("sampler selected no token")?;
            sampler.accept(token);
            sequence.push(token.0);

            if params.early_stopping && (token == eos || self.model.is_eog_token(token)) {
                break;
            }

            batch.clear();
            batch.add(token, (sequence.len() - 1) as i32, &[0], true)?;
            ctx.decode(&mut batch).context("decode step")?;
        }

        Ok(sequence)
    }

    fn memory(&self) -> MemoryFootprint {
        MemoryFootprint { allocated: self.model.size(), reserved: self.file_size }
    }
}
