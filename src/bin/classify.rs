use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sutham::config::AppConfig;
use sutham::models::report::CompositionReport;
use sutham::services::composition::CompositionAnalyzer;
use sutham::services::image;
use sutham::services::model::ConverseHttpClient;
use tracing_subscriber::EnvFilter;

/// Garbage composition report over a single image: same model endpoint as
/// ticket extraction but a prompt-only pipeline, no tool callback.
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
            eprintln!("Usage: classify <image-path-or-url> [output.json]");
            return ExitCode::FAILURE;
        }
    };
    let output = args.next().unwrap_or_else(|| "garbage_result.json".to_string());

    match run(&source, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(source: &str, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    println!("⏳ Loading image: {source}");
    let loaded = image::load(source).await?;
    println!("   Format: {}, {} bytes", loaded.encoding, loaded.bytes.len());

    let model = ConverseHttpClient::new(
        &config.model_endpoint,
        &config.model_api_token,
        &config.model_id,
        Duration::from_secs(config.model_timeout_secs),
    )?;
    let analyzer = CompositionAnalyzer::new(Arc::new(model));

    println!("⏳ Sending to {}...", config.model_id);
    let report = analyzer.analyze(&loaded.bytes, loaded.encoding, source).await?;

    print_report(&report);

    std::fs::write(output, serde_json::to_string_pretty(&report)?)?;
    println!("✅ Saved → {output}");

    Ok(())
}

fn print_report(report: &CompositionReport) {
    let assessment = &report.assessment;

    println!();
    println!("{}", "=".repeat(55));
    println!("        GARBAGE DETECTION REPORT");
    println!("{}", "=".repeat(55));
    println!("  Image       : {}", report.image_source);
    println!("  Model       : {}", report.model_id);
    println!("  Total Count : {} items", assessment.total_garbage_count);
    println!("  Severity    : {}", assessment.severity_level.to_uppercase());
    println!("  Cleanliness : {}/10", assessment.cleanliness_score);
    println!("  Summary     : {}", assessment.summary);
    println!(
        "  Tokens      : {} in / {} out",
        report.tokens_used.input, report.tokens_used.output
    );
    println!("{}", "-".repeat(55));
    println!("  GARBAGE BREAKDOWN:");
    println!("{}", "-".repeat(55));
    for item in &assessment.garbage_types {
        let bar = "█".repeat((item.confidence * 10.0) as usize);
        println!(
            "  • {:<25} Qty: {:<4} Conf: {:<10} ({:.0}%)",
            item.category.to_string(),
            item.quantity,
            bar,
            item.confidence * 100.0
        );
        println!("    Location: {}", item.location_in_image);
    }
    println!("{}", "=".repeat(55));
}
