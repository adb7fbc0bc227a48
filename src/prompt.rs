//! Renders a conversation into the prompt string a model family expects.

use crate::registry::TemplateFamily;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

pub fn format_prompt(messages: &[Message], family: TemplateFamily) -> String {
    match family {
        TemplateFamily::Llama3 => llama3(messages),
        TemplateFamily::TinyLlama => tinyllama(messages),
        TemplateFamily::DialoGpt => dialogpt(messages),
        TemplateFamily::Generic => generic(messages),
    }
}

/// Same as [`format_prompt`] with the family derived from the model id.
pub fn format_for_model(messages: &[Message], identifier: &str) -> String {
    format_prompt(messages, TemplateFamily::classify(identifier))
}

fn llama3(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(&format!(
            "<|start_header_id|>{}<|end_header_id|>\n{}<|eot_id|>\n",
            m.role.as_str(),
            m.content
        ));
    }
    out.push_str("<|start_header_id|>assistant<|end_header_id|>\n");
    out
}

fn tinyllama(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(&format!("<|{}|>\n{}</s>\n", m.role.as_str(), m.content));
    }
    out.push_str("<|assistant|>\n");
    out
}

// DialoGPT sees no history: system context plus the latest turn only.
fn dialogpt(messages: &[Message]) -> String {
    let context = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| format!("{} ", m.content))
        .unwrap_or_default();
    let last = messages
        .iter()
        .rev()
        .find(|m| m.role != Role::System)
        .map(|m| m.content.as_str())
        .unwrap_or("");
    format!("{context}{last}")
}

fn generic(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(&format!("{}: {}\n", m.role.label(), m.content));
    }
    out.push_str("Assistant:");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convo() -> Vec<Message> {
        vec![
            Message::new(Role::System, "ctx"),
            Message::new(Role::User, "A"),
            Message::new(Role::Assistant, "B"),
            Message::new(Role::User, "C"),
        ]
    }

    #[test]
    fn llama_wraps_each_turn() {
        let msgs = vec![Message::new(Role::System, "S"), Message::new(Role::User, "U")];
        let p = format_for_model(&msgs, "Orenguteng/Llama-3-8B-Lexi-Uncensored");
        assert!(p.contains("<|start_header_id|>system<|end_header_id|>\nS<|eot_id|>\n"));
        assert!(p.contains("<|start_header_id|>user<|end_header_id|>\nU<|eot_id|>\n"));
        assert!(p.ends_with("<|start_header_id|>assistant<|end_header_id|>\n"));
    }

    #[test]
    fn tinyllama_tags() {
        let msgs = vec![Message::new(Role::User, "hello")];
        assert_eq!(
            format_prompt(&msgs, TemplateFamily::TinyLlama),
            "<|user|>\nhello</s>\n<|assistant|>\n"
        );
    }

    #[test]
    fn dialogpt_keeps_only_last_turn() {
        assert_eq!(format_for_model(&convo(), "microsoft/DialoGPT-medium"), "ctx C");
    }

    #[test]
    fn dialogpt_without_turns_is_just_context() {
        let msgs = vec![Message::new(Role::System, "ctx")];
        assert_eq!(format_prompt(&msgs, TemplateFamily::DialoGpt), "ctx ");
        assert_eq!(format_prompt(&[], TemplateFamily::DialoGpt), "");
    }

    #[test]
    fn generic_transcript() {
        let msgs = vec![Message::new(Role::User, "hi")];
        assert_eq!(format_for_model(&msgs, "acme/unknown"), "Human: hi\nAssistant:");

        let p = format_prompt(&convo(), TemplateFamily::Generic);
        assert_eq!(p, "System: ctx\nHuman: A\nAssistant: B\nHuman: C\nAssistant:");
    }

    #[test]
    fn deterministic() {
        for family in [
            TemplateFamily::Llama3,
            TemplateFamily::TinyLlama,
            TemplateFamily::DialoGpt,
            TemplateFamily::Generic,
        ] {
            assert_eq!(format_prompt(&convo(), family), format_prompt(&convo(), family));
        }
    }
}
