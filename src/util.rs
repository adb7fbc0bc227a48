use anyhow::{bail, Context};
use encoding_rs::{CoderResult, Decoder};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn read_to_string<P: AsRef<Path>>(p: P) -> anyhow::Result<String> {
    fs::read_to_string(&p).with_context(|| format!("read file {:?}", p.as_ref()))
}

/// Finds the GGUF weights for `identifier` under `models_dir`.
///
/// `<dir>/<id>.gguf` wins; otherwise the first `*.gguf` (by name) inside
/// `<dir>/<id>/` is used.
pub fn resolve_model_file(models_dir: &Path, identifier: &str) -> anyhow::Result<PathBuf> {
    let direct = models_dir.join(format!("{identifier}.gguf"));
    if direct.is_file() {
        return Ok(direct);
    }

    let dir = models_dir.join(identifier);
    if dir.is_dir() {
        let mut found: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("read model dir {:?}", dir))?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("gguf"))
            .collect();
        found.sort();
        if let Some(first) = found.into_iter().next() {
            return Ok(first);
        }
    }

    bail!("no GGUF weights for {identifier} under {:?}", models_dir)
}

/// Joins token byte pieces into text. A UTF-8 sequence may be split across
/// pieces; anything still incomplete at the end becomes U+FFFD.
pub fn decode_utf8_pieces<B: AsRef<[u8]>>(pieces: &[B]) -> String {
    let mut decoder = encoding_rs::UTF_8.new_decoder();
    let mut out = String::new();
    for piece in pieces {
        decode_into(&mut decoder, piece.as_ref(), &mut out, false);
    }
    decode_into(&mut decoder, &[], &mut out, true);
    out
}

// encoding_rs writes only into spare capacity, so reserve before each call.
fn decode_into(decoder: &mut Decoder, mut bytes: &[u8], out: &mut String, last: bool) {
    loop {
        let need = decoder.max_utf8_buffer_length(bytes.len()).unwrap_or(bytes.len() * 3 + 4);
        out.reserve(need);
        let (result, read, _) = decoder.decode_to_string(bytes, out, last);
        bytes = &bytes[read..];
        if result == CoderResult::InputEmpty {
            break;
        }
    }
}

/// Whitespace-separated word count, used for the approximate `usage` numbers.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
