use std::path::PathBuf;

use clap::Parser;

/// Batch runner for chat-completion prompts
#[derive(Debug, Parser)]
#[command(name = "lmkit", about = "Run a batch of prompts against a chat-completion endpoint")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lmkit.toml", env = "LMKIT_CONFIG")]
    pub config: PathBuf,

    /// Endpoint to use; defaults to the first one configured
    #[arg(short, long, env = "LMKIT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// JSONL file with one prompt per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write results; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run one prompt at a time instead of concurrently
    #[arg(long)]
    pub sequential: bool,
}
