use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scandrop::analysis::types::AnalysisConfig;
use scandrop::analysis::GeminiClient;
use scandrop::committer::Committer;
use scandrop::pipeline::Pipeline;
use scandrop::watcher;

/// Environment variable holding the API credential.
const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Parser)]
#[command(
    name = "scandrop",
    about = "Files scanned documents by AI-extracted metadata",
    version
)]
struct Args {
    /// Directory to watch for new scans.
    #[arg(long, value_name = "DIR")]
    watch: PathBuf,

    /// Root directory for processed documents.
    #[arg(long, value_name = "DIR")]
    dest: PathBuf,

    /// Generative model to use.
    #[arg(long, default_value = "gemini-3-flash-preview")]
    model: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // RUST_LOG overrides; default keeps per-file outcomes visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let api_key = match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            tracing::error!("{} environment variable not set", API_KEY_VAR);
            return ExitCode::FAILURE;
        }
    };

    let client = match GeminiClient::new(AnalysisConfig::new(api_key, args.model.clone())) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create analysis client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = Arc::new(Pipeline::new(client, Committer::new(&args.dest)));

    tracing::info!("Scanner intake started");
    tracing::info!("Watching: {}", args.watch.display());
    tracing::info!("Output:   {}", args.dest.display());
    tracing::info!("Model:    {}", args.model);

    if let Err(e) = watcher::run(&args.watch, pipeline).await {
        tracing::error!("Watcher failed: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
