//! API configuration.

use std::path::PathBuf;

use playcoach_gemini::GeminiConfig;
use playcoach_worker::WorkerConfig;
use uuid::Uuid;

/// Default upload limit, matching the 16 MiB cap on video uploads.
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Directory uploaded videos are saved to
    pub upload_folder: PathBuf,
    /// Ledger document path
    pub ledger_path: PathBuf,
    /// Key used to sign session cookies
    pub session_secret: String,
    /// Encrypted per-session API keys
    pub api_keys_file: PathBuf,
    /// Secret the stored API keys are encrypted under
    pub encryption_key: String,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Pipeline settings for uploads processed in the background
    pub worker: WorkerConfig,
    /// Remote client settings; the API key comes from the session
    pub gemini: GeminiConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            upload_folder: PathBuf::from("uploads"),
            ledger_path: PathBuf::from("processed_videos.json"),
            session_secret: random_secret(),
            api_keys_file: PathBuf::from("api_keys.json"),
            encryption_key: random_secret(),
            environment: "development".to_string(),
            metrics_enabled: true,
            worker: WorkerConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let worker = WorkerConfig::from_env();
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),
            upload_folder: std::env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            ledger_path: worker.ledger_path.clone(),
            session_secret: std::env::var("SESSION_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(random_secret),
            api_keys_file: std::env::var("API_KEYS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("api_keys.json")),
            encryption_key: std::env::var("ENCRYPTION_KEY")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(random_secret),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            worker,
            gemini: GeminiConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }
}

/// Whether an `ENVIRONMENT` value names production, ignoring case and padding.
pub fn is_production_env(environment: &str) -> bool {
    environment.trim().eq_ignore_ascii_case("production")
}

/// Fresh secret for a key left unset; anything derived from it dies with the process.
fn random_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_body_size, 16 * 1024 * 1024);
        assert_eq!(config.upload_folder, PathBuf::from("uploads"));
        assert_eq!(config.api_keys_file, PathBuf::from("api_keys.json"));
        assert_ne!(config.encryption_key, config.session_secret);
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_check_ignores_case() {
        assert!(is_production_env("production"));
        assert!(is_production_env("Production"));
        assert!(is_production_env(" PRODUCTION "));
        assert!(!is_production_env("development"));
        assert!(!is_production_env(""));

        let config = ApiConfig {
            environment: "PRODUCTION".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.is_production());
    }

    #[test]
    fn test_random_secret_differs() {
        assert_ne!(random_secret(), random_secret());
        assert_eq!(random_secret().len(), 64);
    }
}
