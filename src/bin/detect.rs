use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sutham::config::AppConfig;
use sutham::services::extractor::TicketExtractor;
use sutham::services::model::ConverseHttpClient;
use sutham::services::{image, store};
use tracing_subscriber::EnvFilter;

/// One-off detection run: load an image from a path or URL, run a single
/// extraction call, print the ticket and persist it.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let source = match args.next() {
        Some(s) => s,
        None => {
            eprintln!("Usage: detect <image-path-or-url>");
            return ExitCode::FAILURE;
        }
    };

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config, &source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e}");
            let artifact_dir = std::path::Path::new(&config.artifact_dir);
            match store::write_error_artifact(artifact_dir, &e.to_string()) {
                Ok(path) => eprintln!("Error artifact saved → {}", path.display()),
                Err(artifact_err) => eprintln!("Failed to write error artifact: {artifact_err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &AppConfig, source: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("⏳ Loading image: {source}");
    let loaded = image::load(source).await?;
    println!("   Format: {}, {} bytes", loaded.encoding, loaded.bytes.len());

    let model = ConverseHttpClient::new(
        &config.model_endpoint,
        &config.model_api_token,
        &config.model_id,
        Duration::from_secs(config.model_timeout_secs),
    )?;
    let extractor = TicketExtractor::new(Arc::new(model));

    println!("⏳ Running {} waste detection...", config.model_id);
    let ticket = extractor.extract(&loaded.bytes, loaded.encoding).await?;

    println!("✅ Ticket Generated");
    println!("{}", serde_json::to_string_pretty(&ticket)?);

    let pool = store::init_pool(&config.database_url).await?;
    store::init_schema(&pool).await?;
    store::insert_ticket(&pool, &ticket).await?;

    let path = store::write_ticket_artifact(std::path::Path::new(&config.artifact_dir), &ticket)?;
    println!("✅ Results saved → {}", path.display());

    Ok(())
}
