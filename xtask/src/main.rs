mod bench;
mod emoji;
mod lines;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "xtask", about = "Developer utilities")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load-test a running server's chat endpoint.
    Bench {
        #[arg(default_value = "http://127.0.0.1:8000/chat/completions")]
        url: String,
        #[arg(long, default_value_t = 8)]
        clients: usize,
        #[arg(long, default_value_t = 200)]
        total: usize,
    },
    /// Count lines per file and in total, skipping vendored and binary files.
    CountLines { directory: PathBuf },
    /// Remove emoji from source files under a directory (default: cwd).
    StripEmojis {
        directory: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match Cli::parse().cmd {
        Cmd::Bench { url, clients, total } => bench::run(&url, clients, total).await,
        Cmd::CountLines { directory } => lines::run(&directory),
        Cmd::StripEmojis { directory, dry_run } => {
            let dir = match directory {
                Some(d) => d,
                None => std::env::current_dir()?,
            };
            emoji::run(&dir, dry_run)
        }
    }
}
