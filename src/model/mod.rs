use crate::device::{Capabilities, Device};
use anyhow::Result;

pub type TokenId = i32;

/// Decoding settings handed to [`LanguageModel::generate`].
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingParams {
    /// Total sequence length ceiling, prompt included.
    pub max_length: usize,
    pub num_return_sequences: usize,
    pub temperature: f32,
    pub do_sample: bool,
    pub pad_token_id: TokenId,
    pub eos_token_id: TokenId,
    pub no_repeat_ngram_size: usize,
    pub repetition_penalty: f32,
    pub early_stopping: bool,
}

/// Weights plus tokenizer for one model. All calls block; run them on the
/// blocking pool.
pub trait LanguageModel: Send + Sync + 'static {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>>;
    /// Decodes with special tokens skipped.
    fn decode(&self, tokens: &[TokenId]) -> Result<String>;
    fn eos_token_id(&self) -> TokenId;
    fn pad_token_id(&self) -> Option<TokenId> {
        None
    }
    fn max_position_embeddings(&self) -> Option<usize>;
    /// Returns the whole sequence: `input` followed by the generated tokens.
    fn generate(&self, input: &[TokenId], params: &SamplingParams) -> Result<Vec<TokenId>>;
    fn memory(&self) -> MemoryFootprint {
        MemoryFootprint::default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryFootprint {
    /// Bytes held by the loaded tensors.
    pub allocated: u64,
    /// Bytes mapped for the model, usually the weights file size.
    pub reserved: u64,
}

impl std::ops::Add for MemoryFootprint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { allocated: self.allocated + rhs.allocated, reserved: self.reserved + rhs.reserved }
    }
}

/// The inference runtime: knows what hardware it can use and how to turn a
/// model id into a [`LanguageModel`].
#[async_trait::async_trait]
pub trait ModelRuntime: Send + Sync + 'static {
    fn capabilities(&self) -> Capabilities;
    async fn load(&self, identifier: &str, device: Device) -> Result<Box<dyn LanguageModel>>;
}

/// A model resident in the cache.
pub struct LoadedModel {
    pub id: String,
    pub device: Device,
    pub model: Box<dyn LanguageModel>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel").field("id", &self.id).field("device", &self.device).finish()
    }
}

#[cfg(feature = "llama")]
pub mod llama;
