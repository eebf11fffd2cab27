use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::extractor::TicketExtractor;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub extractor: Arc<TicketExtractor>,
    pub artifact_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        extractor: TicketExtractor,
        artifact_dir: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            extractor: Arc::new(extractor),
            artifact_dir: artifact_dir.into(),
            image_dir: image_dir.into(),
        }
    }
}
