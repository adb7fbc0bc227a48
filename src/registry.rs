use crate::util;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MODEL: &str = "Orenguteng/Llama-3-8B-Lexi-Uncensored";

/// Prompt convention a model was trained with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFamily {
    /// `<|start_header_id|>role<|end_header_id|>` turns closed by `<|eot_id|>`.
    Llama3,
    /// `<|role|>` tags closed by `</s>`.
    TinyLlama,
    /// Single-turn: optional context prefix plus the latest message.
    DialoGpt,
    /// `Human:` / `Assistant:` transcript.
    Generic,
}

impl TemplateFamily {
    /// Derives a family from a model id. "llama" is checked first, so any id
    /// mentioning TinyLlama also lands on `Llama3`; registry entries that need
    /// the TinyLlama template carry the tag explicitly.
    pub fn classify(identifier: &str) -> Self {
        let lower = identifier.to_lowercase();
        if lower.contains("llama") {
            TemplateFamily::Llama3
        } else if lower.contains("tinyllama") {
            TemplateFamily::TinyLlama
        } else if identifier.contains("DialoGPT") {
            TemplateFamily::DialoGpt
        } else {
            TemplateFamily::Generic
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub context_length: Option<u32>,
    #[serde(default)]
    pub family: Option<TemplateFamily>,
}

impl ModelDescriptor {
    pub fn family(&self) -> TemplateFamily {
        self.family.unwrap_or_else(|| TemplateFamily::classify(&self.id))
    }
}

/// Static catalog of servable models. Read-only once built.
#[derive(Clone, Debug)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            ModelDescriptor {
                id: DEFAULT_MODEL.to_string(),
                name: "Llama 3.1 8B Lexi Uncensored".to_string(),
                description: "Meta's powerful 8B parameter language model with improved reasoning and capabilities".to_string(),
                parameters: Some("8B".to_string()),
                context_length: Some(8192),
                family: Some(TemplateFamily::Llama3),
            },
            ModelDescriptor {
                id: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
                name: "TinyLlama 1.1B Chat".to_string(),
                description: "Compact chat model for CPU-only machines".to_string(),
                parameters: Some("1.1B".to_string()),
                context_length: Some(2048),
                family: Some(TemplateFamily::TinyLlama),
            },
            ModelDescriptor {
                id: "microsoft/DialoGPT-medium".to_string(),
                name: "DialoGPT Medium".to_string(),
                description: "Single-turn conversational response model".to_string(),
                parameters: Some("355M".to_string()),
                context_length: Some(1024),
                family: Some(TemplateFamily::DialoGpt),
            },
        ])
    }

    /// Loads a catalog from a JSON array of descriptors.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = util::read_to_string(&path)?;
        let models: Vec<ModelDescriptor> = serde_json::from_str(&raw)
            .with_context(|| format!("parse model catalog {:?}", path.as_ref()))?;
        Ok(Self::new(models))
    }

    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, identifier: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == identifier)
    }

    pub fn exists(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
