#![allow(dead_code)]

use alterego_server::device::{Capabilities, Device};
use alterego_server::model::{LanguageModel, MemoryFootprint, ModelRuntime, SamplingParams, TokenId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Character-level model: every char is one token, and generation appends a
/// scripted reply.
pub struct FakeModel {
    pub reply: String,
    pub fail: bool,
    pub max_positions: Option<usize>,
}

impl LanguageModel for FakeModel {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<TokenId>> {
        Ok(text.chars().map(|c| c as TokenId).collect())
    }

    fn decode(&self, tokens: &[TokenId]) -> anyhow::Result<String> {
        Ok(tokens.iter().filter_map(|&t| char::from_u32(t as u32)).collect())
    }

    fn eos_token_id(&self) -> TokenId {
        0
    }

    fn max_position_embeddings(&self) -> Option<usize> {
        self.max_positions
    }

    fn generate(&self, input: &[TokenId], params: &SamplingParams) -> anyhow::Result<Vec<TokenId>> {
        if self.fail {
            anyhow::bail!("device lost");
        }
        let mut out = input.to_vec();
        for c in self.reply.chars() {
            if out.len() >= params.max_length {
                break;
            }
            out.push(c as TokenId);
        }
        Ok(out)
    }

    fn memory(&self) -> MemoryFootprint {
        MemoryFootprint { allocated: 2_000_000_000, reserved: 3_000_000_000 }
    }
}

pub struct FakeRuntime {
    pub loads: AtomicUsize,
    pub delay: Duration,
    pub fail_load: bool,
    pub fail_generate: bool,
    pub reply: String,
    pub caps: Capabilities,
}

impl FakeRuntime {
    pub fn replying(reply: &str) -> Self {
        Self {
            loads: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_load: false,
            fail_generate: false,
            reply: reply.to_string(),
            caps: Capabilities::default(),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelRuntime for FakeRuntime {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn load(&self, identifier: &str, _device: Device) -> anyhow::Result<Box<dyn LanguageModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_load {
            anyhow::bail!("no GGUF weights for {identifier}");
        }
        Ok(Box::new(FakeModel {
            reply: self.reply.clone(),
            fail: self.fail_generate,
            max_positions: Some(8192),
        }))
    }
}

pub fn shared(runtime: FakeRuntime) -> Arc<FakeRuntime> {
    Arc::new(runtime)
}
