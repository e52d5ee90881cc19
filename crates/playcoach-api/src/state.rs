//! Application state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use playcoach_gemini::{GeminiClient, GeminiConfig, GeminiResult, VideoService};
use playcoach_ledger::Ledger;
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;

/// Builds a remote client bound to one session's API key.
pub trait ServiceFactory: Send + Sync {
    fn create(&self, api_key: &str) -> GeminiResult<Arc<dyn VideoService>>;
}

/// Factory for real Gemini clients.
pub struct GeminiServiceFactory {
    config: GeminiConfig,
}

impl GeminiServiceFactory {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

impl ServiceFactory for GeminiServiceFactory {
    fn create(&self, api_key: &str) -> GeminiResult<Arc<dyn VideoService>> {
        Ok(Arc::new(GeminiClient::new(self.config.clone(), api_key)?))
    }
}

/// Filenames with a background pipeline currently running.
#[derive(Clone, Default)]
pub struct InFlight {
    names: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    /// Claim a filename; `None` if a pipeline for it is already running.
    pub fn try_claim(&self, filename: &str) -> Option<InFlightGuard> {
        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        if !names.insert(filename.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            names: Arc::clone(&self.names),
            filename: filename.to_string(),
        })
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(filename)
    }
}

/// Releases its filename when dropped.
pub struct InFlightGuard {
    names: Arc<Mutex<HashSet<String>>>,
    filename: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.filename);
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub ledger: Arc<Ledger>,
    pub sessions: Arc<SessionStore>,
    pub services: Arc<dyn ServiceFactory>,
    pub in_flight: InFlight,
    /// Cancelled on shutdown to stop background pipelines
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state backed by real Gemini clients.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let services = Arc::new(GeminiServiceFactory::new(config.gemini.clone()));
        Self::with_services(config, services).await
    }

    /// Create state with a custom client factory.
    pub async fn with_services(
        config: ApiConfig,
        services: Arc<dyn ServiceFactory>,
    ) -> ApiResult<Self> {
        tokio::fs::create_dir_all(&config.upload_folder)
            .await
            .map_err(|e| {
                ApiError::internal(format!(
                    "Failed to create upload folder {}: {}",
                    config.upload_folder.display(),
                    e
                ))
            })?;

        let ledger = Arc::new(Ledger::open(&config.ledger_path).await?);
        let sessions = Arc::new(
            SessionStore::open(
                &config.api_keys_file,
                config.session_secret.clone(),
                &config.encryption_key,
            )
            .await?,
        );

        Ok(Self {
            config: Arc::new(config),
            ledger,
            sessions,
            services,
            in_flight: InFlight::default(),
            shutdown: CancellationToken::new(),
        })
    }
}
