use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "alterego-server", version, about = "Chat completion server for local GGUF models")]
pub struct Config {
    #[arg(long, env, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, env, default_value_t = 8000)]
    pub port: u16,
    /// Directory holding `<model id>.gguf` files or `<model id>/` folders.
    #[arg(long, env, default_value = "./models")]
    pub models_dir: PathBuf,
    /// JSON catalog replacing the built-in model list.
    #[arg(long, env)]
    pub model_catalog: Option<PathBuf>,
    #[arg(long, env, default_value_t = 999)]
    pub n_gpu_layers: u32,
    #[arg(long, env, default_value_t = 512)]
    pub n_batch: u32,
    /// Defaults to every core.
    #[arg(long, env)]
    pub n_threads: Option<i32>,
    #[arg(long, env, default_value_t = 64)]
    pub repeat_last_n: i32,
}

impl Config {
    /// Listener target; `host` may be an IP literal or a hostname.
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    pub fn threads(&self) -> i32 {
        self.n_threads.unwrap_or_else(|| num_cpus::get() as i32)
    }
}
