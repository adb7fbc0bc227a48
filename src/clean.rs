pub const FALLBACK_RESPONSE: &str =
    "Hello! My normal response failed, so this is a fallback response. How can I assist you?";

const END_MARKERS: &[&str] = &["<|eot_id|>", "<|endoftext|>", "</s>"];

// The model started writing the user's next turn.
const USER_TURN_MARKERS: &[&str] = &["<|start_header_id|>user<|end_header_id|>", "Human:", "<|user|>"];

fn truncate_at_first<'a>(text: &'a str, markers: &[&str]) -> &'a str {
    let cut = markers.iter().filter_map(|m| text.find(m)).min();
    match cut {
        Some(i) => &text[..i],
        None => text,
    }
}

/// Strips turn delimiters and any fabricated follow-up turn from a raw
/// continuation. Never returns an empty string.
pub fn clean_response(raw: &str) -> String {
    let text = truncate_at_first(raw.trim(), END_MARKERS).trim();
    let text = truncate_at_first(text, USER_TURN_MARKERS).trim();
    if text.is_empty() {
        tracing::warn!("generated response was empty, using fallback");
        return FALLBACK_RESPONSE.to_string();
    }
    text.to_string()
}
