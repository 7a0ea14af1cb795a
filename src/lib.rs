//! polyglot-cms: translation management core for a multilingual marketing CMS.
//! Library entry: module tree, tracing setup, and wiring of the gate, the
//! store and the manager into one context.

pub mod admin_view;
pub mod cancellation;
pub mod config;
pub mod gate;
pub mod languages;
pub mod manager;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod sanitize;
pub mod store;
pub mod token_budget;

use std::sync::Arc;

use tracing::{info, warn};

use admin_view::TranslationsView;
use config::{AppConfig, LogFormat};
use gate::{GateError, HttpGate, TranslationGate};
use manager::TranslationManager;
use metrics::MetricsRegistry;
use models::Post;
use store::{SqliteTranslationStore, StoreError, TranslationStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the admin screens need, built once per process.
pub struct AppContext {
    pub manager: Arc<TranslationManager>,
    pub view: TranslationsView,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppContext {
    /// Wire the HTTP gate and the SQLite store from `config`, then load the
    /// first snapshot.
    pub async fn bootstrap(config: &AppConfig, posts: Vec<Post>) -> Result<Self, StartupError> {
        let gate: Arc<dyn TranslationGate> = Arc::new(HttpGate::new(&config.gate)?);
        let store: Arc<dyn TranslationStore> = Arc::new(SqliteTranslationStore::open(&config.db_path)?);
        let context = Self::with_backends(config, posts, gate, store);

        if let Err(e) = context.manager.refresh().await {
            warn!(error = %e, "initial translations refresh failed");
        }
        info!(
            posts = context.manager.posts().len(),
            translations = context.manager.translations().len(),
            "translation manager ready"
        );
        Ok(context)
    }

    pub fn with_backends(
        config: &AppConfig,
        posts: Vec<Post>,
        gate: Arc<dyn TranslationGate>,
        store: Arc<dyn TranslationStore>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let manager = Arc::new(
            TranslationManager::new(posts, gate, store, config.manager.clone())
                .with_metrics(Arc::clone(&metrics)),
        );
        Self {
            view: TranslationsView::new(Arc::clone(&manager)),
            manager,
            metrics,
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("polyglot_cms=debug,info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.with_thread_ids(true).try_init(),
    };

    if result.is_ok() {
        info!(?format, "tracing initialized");
    }
}
