#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;
mod input;

use std::sync::Arc;

use args::Args;
use clap::Parser;
use lmkit_config::Config;
use lmkit_executor::{Executor, TaskResult};
use lmkit_llm::{ChatModel, HttpChatModel};
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize telemetry
    lmkit_telemetry::init(config.telemetry.as_ref(), "info")?;

    let (endpoint_name, endpoint) = config.endpoint(args.endpoint.as_deref()).ok_or_else(|| {
        anyhow::anyhow!(
            "endpoint '{}' is not configured",
            args.endpoint.as_deref().unwrap_or_default()
        )
    })?;

    let model = HttpChatModel::from_config(endpoint)
        .map_err(|e| anyhow::anyhow!("failed to build endpoint '{endpoint_name}': {e}"))?;
    let model_id = model.model_id();
    let executor = Executor::new(Arc::new(model), &config.executor)?;

    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", args.input.display()))?;
    let prompts = input::parse_prompts(&raw);

    tracing::info!(
        endpoint = endpoint_name,
        model_id = %model_id,
        prompts = prompts.len(),
        sequential = args.sequential,
        "starting batch"
    );

    let batch = async {
        if args.sequential {
            executor.run(prompts).await
        } else {
            executor.run_concurrent(prompts).await
        }
    };

    let results = tokio::select! {
        results = batch => results?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, discarding in-flight tasks");
            return Ok(());
        }
    };

    let failed = results.iter().filter(|r| !r.is_success()).count();
    write_results(&results, &args).await?;

    tracing::info!(tasks = results.len(), failed, "batch finished");
    Ok(())
}

/// Write one JSON result per line, in input order
async fn write_results(results: &[TaskResult], args: &Args) -> anyhow::Result<()> {
    let mut buf = Vec::new();
    for result in results {
        serde_json::to_writer(&mut buf, result)?;
        buf.push(b'\n');
    }

    match &args.output {
        Some(path) => tokio::fs::write(path, &buf)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&buf).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
