//! Translation manager: owns the translations snapshot, the transient key
//! sets and per-post model selection, and mediates every translate / retry /
//! cancel / publish / delete action.
//!
//! Key-set rules:
//! - a key is never in `translating` and `failed_translations` at once; every
//!   move between them happens under one lock together with the attempt
//!   ledger check
//! - languages of one trigger are sent one at a time, each settled before the
//!   next request goes out
//! - the snapshot is only ever replaced by a full store re-fetch
//! - cancel is bookkeeping: the request keeps running unless
//!   `abort_on_cancel` is set

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cancellation::{AttemptGuard, AttemptLedger};
use crate::config::ManagerConfig;
use crate::gate::{GateError, GateRequest, LanguageOutcome, TranslationGate};
use crate::languages;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::models::{
    NewTranslation, Post, Translation, TranslationEdit, TranslationKey, TranslationStatus,
};
use crate::store::{StoreError, TranslationStore};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("post {0} not found")]
    PostNotFound(String),
    #[error("language {0} is not supported")]
    UnsupportedLanguage(String),
    #[error("no pending translation for {0}")]
    NotPending(TranslationKey),
    #[error("translation for {0} already exists")]
    TranslationExists(TranslationKey),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to one requested language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum LanguageResult {
    /// The gate reported success; the row arrives with the refresh.
    Completed,
    /// A row already existed; nothing was sent.
    Skipped,
    /// Another call is already waiting on the gate for this key.
    AlreadyInFlight,
    Failed(String),
    /// Settled after being cancelled or superseded; state left untouched.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub post_id: String,
    pub model: String,
    pub results: Vec<(String, LanguageResult)>,
}

impl TriggerReport {
    pub fn result_for(&self, language: &str) -> Option<&LanguageResult> {
        self.results
            .iter()
            .find(|(code, _)| code == language)
            .map(|(_, r)| r)
    }

    /// Languages for which a gate request was actually sent.
    pub fn requested(&self) -> impl Iterator<Item = &str> {
        self.results.iter().filter_map(|(code, r)| match r {
            LanguageResult::Skipped | LanguageResult::AlreadyInFlight => None,
            _ => Some(code.as_str()),
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.results.iter().filter_map(|(code, r)| match r {
            LanguageResult::Failed(_) => Some(code.as_str()),
            _ => None,
        })
    }
}

/// Domain events for whatever presents notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranslationEvent {
    Started { key: TranslationKey, model: String, retry: bool },
    Skipped { key: TranslationKey },
    AlreadyInFlight { key: TranslationKey },
    Completed { key: TranslationKey },
    Failed { key: TranslationKey, reason: String },
    Cancelled { key: TranslationKey },
    Refreshed { rows: usize },
}

/// Consistent copy of everything the admin view renders from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerSnapshot {
    pub translations: Vec<Translation>,
    pub translating: HashSet<TranslationKey>,
    pub failed_translations: HashSet<TranslationKey>,
    pub retrying: HashSet<TranslationKey>,
}

impl ManagerSnapshot {
    pub fn row_for(&self, key: &TranslationKey) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|t| t.post_id == key.post_id && t.language_code == key.language)
    }
}

#[derive(Default)]
struct SlotState {
    translations: Vec<Translation>,
    translating: HashSet<TranslationKey>,
    failed: HashSet<TranslationKey>,
    retrying: HashSet<TranslationKey>,
    attempts: AttemptLedger,
}

pub struct TranslationManager {
    gate: Arc<dyn TranslationGate>,
    store: Arc<dyn TranslationStore>,
    metrics: Arc<MetricsRegistry>,
    config: ManagerConfig,
    posts: RwLock<Vec<Post>>,
    models: RwLock<HashMap<String, String>>,
    state: Mutex<SlotState>,
    events: broadcast::Sender<TranslationEvent>,
}

impl TranslationManager {
    pub fn new(
        posts: Vec<Post>,
        gate: Arc<dyn TranslationGate>,
        store: Arc<dyn TranslationStore>,
        config: ManagerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            gate,
            store,
            metrics: Arc::new(MetricsRegistry::new()),
            config,
            posts: RwLock::new(posts),
            models: RwLock::new(HashMap::new()),
            state: Mutex::new(SlotState::default()),
            events,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranslationEvent> {
        self.events.subscribe()
    }

    // --- Read surfaces ---

    pub fn translations(&self) -> Vec<Translation> {
        self.state.lock().translations.clone()
    }

    pub fn translating(&self) -> HashSet<TranslationKey> {
        self.state.lock().translating.clone()
    }

    pub fn failed_translations(&self) -> HashSet<TranslationKey> {
        self.state.lock().failed.clone()
    }

    pub fn retrying(&self) -> HashSet<TranslationKey> {
        self.state.lock().retrying.clone()
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let state = self.state.lock();
        ManagerSnapshot {
            translations: state.translations.clone(),
            translating: state.translating.clone(),
            failed_translations: state.failed.clone(),
            retrying: state.retrying.clone(),
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.read().clone()
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.posts.read().iter().find(|p| p.id == post_id).cloned()
    }

    pub fn replace_posts(&self, posts: Vec<Post>) {
        *self.posts.write() = posts;
    }

    // --- Model selection ---

    pub fn model_for(&self, post_id: &str) -> String {
        self.models
            .read()
            .get(post_id)
            .cloned()
            .unwrap_or_else(|| self.config.default_model.clone())
    }

    /// Affects only later triggers for this post.
    pub fn set_model(&self, post_id: &str, model: impl Into<String>) {
        let model = model.into();
        info!(post_id, model = %model, "translation model selected");
        self.models.write().insert(post_id.to_string(), model);
    }

    // --- Operations ---

    /// Request a translation for each language in turn, then re-fetch the
    /// snapshot once. Per-language failures are recorded, never returned.
    pub async fn trigger_translation(
        &self,
        post_id: &str,
        languages: &[&str],
    ) -> Result<TriggerReport, ManagerError> {
        self.validate(post_id, languages)?;
        self.run_trigger(post_id, languages, false).await
    }

    /// Clear the failure record and trigger the single pair again. A persisted
    /// row in `failed` status is removed first so the trigger does not skip it.
    pub async fn retry_translation(
        &self,
        post_id: &str,
        language: &str,
    ) -> Result<TriggerReport, ManagerError> {
        self.validate(post_id, &[language])?;
        let key = TranslationKey::new(post_id, language);

        {
            let mut state = self.state.lock();
            state.failed.remove(&key);
            state.retrying.insert(key.clone());
        }

        let result = self.retry_inner(&key).await;
        {
            let mut state = self.state.lock();
            state.retrying.remove(&key);
            if result.is_err() && !state.translating.contains(&key) {
                state.failed.insert(key.clone());
            }
        }
        if let Err(e) = &result {
            warn!(key = %key, error = %e, "retry aborted before request");
        }
        result
    }

    async fn retry_inner(&self, key: &TranslationKey) -> Result<TriggerReport, ManagerError> {
        if let Some(row) = self.store.find(&key.post_id, &key.language).await? {
            if row.status == TranslationStatus::Failed {
                info!(key = %key, id = %row.id, "removing failed row before retry");
                self.store.delete(&row.id).await?;
            }
        }
        self.run_trigger(&key.post_id, &[key.language.as_str()], true)
            .await
    }

    /// Stop showing the pair as pending and mark it failed. The gate request
    /// itself keeps running unless `abort_on_cancel` is configured; whatever
    /// it resolves to is ignored.
    pub fn cancel_pending_translation(
        &self,
        post_id: &str,
        language: &str,
    ) -> Result<(), ManagerError> {
        let key = TranslationKey::new(post_id, language);
        {
            let mut state = self.state.lock();
            if !state.translating.remove(&key) {
                return Err(ManagerError::NotPending(key));
            }
            state.retrying.remove(&key);
            state.failed.insert(key.clone());
            state.attempts.invalidate(&key, self.config.abort_on_cancel);
        }

        info!(key = %key, abort = self.config.abort_on_cancel, "translation cancelled");
        self.metrics.increment(metric_names::TRANSLATIONS_CANCELLED);
        self.emit(TranslationEvent::Cancelled { key });
        Ok(())
    }

    /// Flip the publish flag from `current_published`. Callers pass the latest
    /// value they know of.
    pub async fn toggle_translation_status(
        &self,
        translation_id: &str,
        current_published: bool,
    ) -> Result<(), ManagerError> {
        self.store
            .set_published(translation_id, !current_published)
            .await?;
        info!(id = translation_id, published = !current_published, "translation publish toggled");
        self.refresh().await
    }

    /// Leaves the key sets alone, even for a pair that is mid-retry.
    pub async fn delete_translation(&self, translation_id: &str) -> Result<(), ManagerError> {
        self.store.delete(translation_id).await?;
        info!(id = translation_id, "translation deleted");
        self.refresh().await
    }

    /// Store a human-authored translation for a pair that has no row yet.
    pub async fn create_manual_translation(
        &self,
        input: NewTranslation,
    ) -> Result<Translation, ManagerError> {
        self.validate(&input.post_id, &[input.language_code.as_str()])?;
        let key = input.key();

        if self.store.find(&input.post_id, &input.language_code).await?.is_some() {
            return Err(ManagerError::TranslationExists(key));
        }

        let row = NewTranslation {
            status: TranslationStatus::Completed,
            is_machine_translated: false,
            ..input
        };
        let created = match self.store.insert(row).await {
            Ok(created) => created,
            Err(StoreError::Duplicate(key)) => return Err(ManagerError::TranslationExists(key)),
            Err(e) => return Err(e.into()),
        };

        self.state.lock().failed.remove(&key);
        info!(key = %key, id = %created.id, "manual translation created");
        self.refresh().await?;
        Ok(created)
    }

    pub async fn update_translation(
        &self,
        translation_id: &str,
        edit: &TranslationEdit,
    ) -> Result<Translation, ManagerError> {
        let updated = self.store.update(translation_id, edit).await?;
        debug!(id = translation_id, "translation updated");
        self.refresh().await?;
        Ok(updated)
    }

    /// Replace the snapshot with a full re-fetch from the store.
    pub async fn refresh(&self) -> Result<(), ManagerError> {
        let span = self.metrics.span(metric_names::STORE_REFRESH);
        let rows = self.store.list_all().await?;
        let count = rows.len();
        self.state.lock().translations = rows;
        span.finish();

        debug!(rows = count, "translations refreshed");
        self.emit(TranslationEvent::Refreshed { rows: count });
        Ok(())
    }

    // --- Internals ---

    fn validate(&self, post_id: &str, codes: &[&str]) -> Result<(), ManagerError> {
        if self.post(post_id).is_none() {
            return Err(ManagerError::PostNotFound(post_id.to_string()));
        }
        if let Some(code) = codes.iter().find(|c| !languages::is_supported(c)) {
            return Err(ManagerError::UnsupportedLanguage(code.to_string()));
        }
        Ok(())
    }

    async fn run_trigger(
        &self,
        post_id: &str,
        languages: &[&str],
        retry: bool,
    ) -> Result<TriggerReport, ManagerError> {
        let span = self.metrics.span(metric_names::TRIGGER_TOTAL);
        let model = self.model_for(post_id);

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(languages.len());
        for &code in languages {
            if !seen.insert(code) {
                continue;
            }
            let key = TranslationKey::new(post_id, code);
            let result = self.translate_one(&key, &model, retry).await;
            results.push((code.to_string(), result));
        }

        self.refresh().await?;
        span.finish();

        Ok(TriggerReport {
            post_id: post_id.to_string(),
            model,
            results,
        })
    }

    async fn translate_one(&self, key: &TranslationKey, model: &str, retry: bool) -> LanguageResult {
        match self.store.find(&key.post_id, &key.language).await {
            Ok(Some(_)) => {
                {
                    let mut state = self.state.lock();
                    state.translating.remove(key);
                    state.failed.remove(key);
                    state.attempts.invalidate(key, false);
                }
                debug!(key = %key, "translation exists, skipping");
                self.metrics.increment(metric_names::TRANSLATIONS_SKIPPED);
                self.emit(TranslationEvent::Skipped { key: key.clone() });
                return LanguageResult::Skipped;
            }
            Ok(None) => {}
            Err(e) => {
                let reason = format!("existing-row check failed: {e}");
                warn!(key = %key, error = %e, "existing-row check failed");
                let inserted = {
                    let mut state = self.state.lock();
                    !state.translating.contains(key) && state.failed.insert(key.clone())
                };
                if inserted {
                    self.metrics.increment(metric_names::TRANSLATIONS_FAILED);
                }
                self.emit(TranslationEvent::Failed {
                    key: key.clone(),
                    reason: reason.clone(),
                });
                return LanguageResult::Failed(reason);
            }
        }

        let guard = {
            let mut state = self.state.lock();
            if state.translating.contains(key) {
                None
            } else {
                state.failed.remove(key);
                state.translating.insert(key.clone());
                Some(state.attempts.begin(key))
            }
        };
        let Some(guard) = guard else {
            debug!(key = %key, "translation already in flight");
            self.emit(TranslationEvent::AlreadyInFlight { key: key.clone() });
            return LanguageResult::AlreadyInFlight;
        };

        info!(key = %key, model, retry, generation = guard.generation(), "translation requested");
        self.emit(TranslationEvent::Started {
            key: key.clone(),
            model: model.to_string(),
            retry,
        });

        let request = GateRequest::single(&key.post_id, &key.language, model);
        let failure = match self.call_gate(&request, &guard).await {
            Ok(reply) => match reply.outcome_for(&key.language) {
                LanguageOutcome::Ok => None,
                LanguageOutcome::Error(reason) => Some(reason),
            },
            Err(e) => Some(e.to_string()),
        };

        self.settle(&guard, failure)
    }

    async fn call_gate(
        &self,
        request: &GateRequest,
        guard: &AttemptGuard,
    ) -> Result<crate::gate::GateReply, GateError> {
        let span = self.metrics.span(metric_names::GATE_CALL);
        let call = tokio::time::timeout(self.config.gate_timeout, self.gate.translate(request));
        let result = tokio::select! {
            res = call => res.unwrap_or(Err(GateError::Timeout)),
            _ = guard.token().cancelled() => Err(GateError::Cancelled),
        };
        span.finish();
        result
    }

    fn settle(&self, guard: &AttemptGuard, failure: Option<String>) -> LanguageResult {
        let key = guard.key();
        {
            let mut state = self.state.lock();
            if !state.attempts.finish(guard) {
                drop(state);
                debug!(
                    key = %key,
                    generation = guard.generation(),
                    succeeded = failure.is_none(),
                    "stale settlement ignored"
                );
                return LanguageResult::Superseded;
            }
            state.translating.remove(key);
            if failure.is_some() {
                state.failed.insert(key.clone());
            }
        }

        match failure {
            None => {
                info!(key = %key, "translation completed");
                self.metrics.increment(metric_names::TRANSLATIONS_COMPLETED);
                self.emit(TranslationEvent::Completed { key: key.clone() });
                LanguageResult::Completed
            }
            Some(reason) => {
                warn!(key = %key, reason = %reason, "translation failed");
                self.metrics.increment(metric_names::TRANSLATIONS_FAILED);
                self.emit(TranslationEvent::Failed {
                    key: key.clone(),
                    reason: reason.clone(),
                });
                LanguageResult::Failed(reason)
            }
        }
    }

    fn emit(&self, event: TranslationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
