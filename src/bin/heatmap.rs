use std::process::ExitCode;

use sutham::services::{heatmap, store};
use tracing_subscriber::EnvFilter;

/// One-off density map over all persisted tickets: reads (lat, lng, weight)
/// rows from the ticket store and writes a Leaflet heatmap HTML file.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "waste_heatmap.html".to_string());

    match run(&output).await {
        Ok(count) => {
            println!("✅ Heatmap generated → {output} ({count} tickets)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(output: &str) -> Result<usize, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:waste.db".to_string());

    let pool = store::init_pool(&database_url).await?;
    store::init_schema(&pool).await?;

    let points = store::heat_points(&pool).await?;
    let html = heatmap::render(&points);
    std::fs::write(output, html)?;

    Ok(points.len())
}
