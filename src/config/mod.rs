use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the CLI binaries.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite connection string for the ticket store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Base URL of the Converse-compatible model endpoint.
    pub model_endpoint: String,

    /// Bearer token for the model endpoint.
    pub model_api_token: String,

    /// Model identifier.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Transport timeout for one model call, in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Directory for JSON ticket/error artifacts.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Directory where uploaded images are kept.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:waste.db?mode=rwc".to_string()
}

fn default_model_id() -> String {
    "amazon.nova-pro-v1:0".to_string()
}

fn default_model_timeout_secs() -> u64 {
    60
}

fn default_artifact_dir() -> String {
    "artifacts".to_string()
}

fn default_image_dir() -> String {
    "images".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
