//! Integration test for real llama.cpp inference.
//! Requires MODEL_PATH pointing at a local GGUF (or one under ./models).
#![cfg(feature = "llama")]

#[tokio::test]
#[ignore = "needs a local GGUF model"]
async fn real_inference_produces_text() -> anyhow::Result<()> {
    use alterego_server::cache::ModelCache;
    use alterego_server::clean::clean_response;
    use alterego_server::config::Config;
    use alterego_server::generate::generate;
    use alterego_server::model::llama::LlamaRuntime;
    use alterego_server::prompt::{format_for_model, Message, Role};
    use clap::Parser;
    use std::{env, fs, path::PathBuf, sync::Arc};
    use walkdir::WalkDir;

    // Resolve model path: prefer $MODEL_PATH, else search ./models for any .gguf
    let model_path: PathBuf = env::var("MODEL_PATH")
        .ok()
        .map(PathBuf::from)
        .filter(|p| fs::metadata(p).is_ok())
        .or_else(|| {
            let root = PathBuf::from("./models");
            if fs::metadata(&root).is_ok() {
                for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
                    let p = entry.into_path();
                    if p.extension().and_then(|s| s.to_str()) == Some("gguf") {
                        return Some(p);
                    }
                }
            }
            None
        })
        .expect("No model found. Set MODEL_PATH or place a .gguf under ./models");

    let dir = model_path.parent().unwrap().to_path_buf();
    let id = model_path.file_stem().unwrap().to_string_lossy().to_string();

    let mut cfg = Config::parse_from(["alterego-server", "--n-gpu-layers", "0"]);
    cfg.models_dir = dir;
    let cache = ModelCache::new(Arc::new(LlamaRuntime::new(&cfg)?));
    let handle = cache.get_or_load(&id).await?;

    let messages = vec![
        Message::new(Role::System, "You are a helpful assistant."),
        Message::new(Role::User, "Say hello in one short sentence."),
    ];
    let prompt = format_for_model(&messages, &id);
    let raw = generate(handle, prompt, 0.0, 32).await?;
    let text = clean_response(&raw);

    assert!(!text.is_empty());
    Ok(())
}
