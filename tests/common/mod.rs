#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use polyglot_cms::config::ManagerConfig;
use polyglot_cms::gate::{GateError, GateReply, GateRequest, LanguageOutcome, TranslationGate};
use polyglot_cms::manager::{TranslationEvent, TranslationManager};
use polyglot_cms::models::{
    NewTranslation, Post, PostStatus, Translation, TranslationEdit, TranslationKey, TranslationStatus,
};
use polyglot_cms::store::{SqliteTranslationStore, StoreError, TranslationStore};
use tokio::sync::{broadcast, Notify};
use tokio::time::Instant;

/// How the scripted gate answers for one language.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Writes a completed row, like the real edge function does.
    Succeed,
    LanguageError(String),
    Transport,
    Rejected(String),
}

#[derive(Clone)]
pub struct Script {
    pub delay: Duration,
    pub reply: Reply,
    /// When set, the gate waits for a notification before answering.
    pub hold: Option<Arc<Notify>>,
}

impl Script {
    pub fn reply(reply: Reply) -> Self {
        Self {
            delay: Duration::ZERO,
            reply,
            hold: None,
        }
    }

    pub fn delayed(reply: Reply, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::reply(reply)
        }
    }

    pub fn held(reply: Reply, hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::reply(reply)
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateCall {
    pub post_id: String,
    pub languages: Vec<String>,
    pub model: String,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// In-process stand-in for the translation edge function.
pub struct ScriptedGate {
    store: Arc<SqliteTranslationStore>,
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<GateCall>>,
}

impl ScriptedGate {
    pub fn new(store: Arc<SqliteTranslationStore>) -> Self {
        Self {
            store,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, language: &str, script: Script) {
        self.scripts.lock().insert(language.to_string(), script);
    }

    pub fn calls(&self) -> Vec<GateCall> {
        self.calls.lock().clone()
    }

    pub fn called_languages(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .flat_map(|c| c.languages.clone())
            .collect()
    }
}

#[async_trait]
impl TranslationGate for ScriptedGate {
    async fn translate(&self, request: &GateRequest) -> Result<GateReply, GateError> {
        assert_eq!(request.target_languages.len(), 1, "gate must be called per language");
        let language = request.target_languages[0].clone();

        let index = {
            let mut calls = self.calls.lock();
            calls.push(GateCall {
                post_id: request.post_id.clone(),
                languages: request.target_languages.clone(),
                model: request.model.clone(),
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };

        let script = self
            .scripts
            .lock()
            .get(&language)
            .cloned()
            .unwrap_or_else(|| Script::reply(Reply::Succeed));

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        if let Some(hold) = &script.hold {
            hold.notified().await;
        }

        let result = match script.reply {
            Reply::Succeed => {
                let row = NewTranslation {
                    is_machine_translated: true,
                    ..NewTranslation::manual(
                        &request.post_id,
                        &language,
                        "Översatt titel",
                        "oversatt-titel",
                        "<p>Översatt</p>",
                    )
                };
                // The real gate upserts; a duplicate here is not an error.
                let _ = self.store.insert(row).await;
                Ok(GateReply {
                    results: vec![(language.clone(), LanguageOutcome::Ok)],
                })
            }
            Reply::LanguageError(reason) => Ok(GateReply {
                results: vec![(language.clone(), LanguageOutcome::Error(reason))],
            }),
            Reply::Transport => Err(GateError::Transport("connection reset".into())),
            Reply::Rejected(reason) => Err(GateError::Rejected(reason)),
        };

        self.calls.lock()[index].finished = Some(Instant::now());
        result
    }
}

pub fn post(id: &str, status: PostStatus) -> Post {
    Post {
        id: id.to_string(),
        title: format!("Post {id}"),
        slug: format!("post-{id}"),
        content: "<p>Compliance made simple.</p>".to_string(),
        excerpt: Some("Short excerpt".to_string()),
        status,
        created_at: 0,
        updated_at: 0,
    }
}

/// Store seen by the manager: delegates to SQLite, but row lookups for
/// chosen languages can be made to fail.
pub struct FaultyStore {
    inner: Arc<SqliteTranslationStore>,
    failing_lookups: Mutex<HashSet<String>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<SqliteTranslationStore>) -> Self {
        Self {
            inner,
            failing_lookups: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_lookups_for(&self, language: &str) {
        self.failing_lookups.lock().insert(language.to_string());
    }

    pub fn heal(&self) {
        self.failing_lookups.lock().clear();
    }
}

#[async_trait]
impl TranslationStore for FaultyStore {
    async fn list_all(&self) -> Result<Vec<Translation>, StoreError> {
        self.inner.list_all().await
    }

    async fn find(&self, post_id: &str, language: &str) -> Result<Option<Translation>, StoreError> {
        if self.failing_lookups.lock().contains(language) {
            return Err(StoreError::Database("database is locked".into()));
        }
        self.inner.find(post_id, language).await
    }

    async fn insert(&self, row: NewTranslation) -> Result<Translation, StoreError> {
        self.inner.insert(row).await
    }

    async fn update(&self, id: &str, edit: &TranslationEdit) -> Result<Translation, StoreError> {
        self.inner.update(id, edit).await
    }

    async fn set_published(&self, id: &str, published: bool) -> Result<(), StoreError> {
        self.inner.set_published(id, published).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

pub struct Harness {
    pub manager: Arc<TranslationManager>,
    pub gate: Arc<ScriptedGate>,
    pub store: Arc<SqliteTranslationStore>,
    pub faults: Arc<FaultyStore>,
}

impl Harness {
    pub fn new(posts: Vec<Post>) -> Self {
        Self::with_config(posts, ManagerConfig::default())
    }

    pub fn with_config(posts: Vec<Post>, config: ManagerConfig) -> Self {
        let store = Arc::new(SqliteTranslationStore::open_in_memory().expect("open store"));
        let gate = Arc::new(ScriptedGate::new(Arc::clone(&store)));
        let faults = Arc::new(FaultyStore::new(Arc::clone(&store)));
        let manager = Arc::new(TranslationManager::new(
            posts,
            gate.clone(),
            faults.clone(),
            config,
        ));
        Self {
            manager,
            gate,
            store,
            faults,
        }
    }

    pub async fn insert_row(&self, post_id: &str, language: &str, status: TranslationStatus) -> String {
        let row = NewTranslation {
            status,
            is_machine_translated: true,
            ..NewTranslation::manual(post_id, language, "Titel", "titel", "<p>Text</p>")
        };
        self.store.insert(row).await.expect("insert row").id
    }

    pub async fn row_count(&self) -> usize {
        self.store.list_all().await.expect("list rows").len()
    }
}

pub fn key(post_id: &str, language: &str) -> TranslationKey {
    TranslationKey::new(post_id, language)
}

/// Wait until the manager announces a request for `key`.
pub async fn wait_started(events: &mut broadcast::Receiver<TranslationEvent>, key: &TranslationKey) {
    loop {
        match events.recv().await.expect("event stream closed") {
            TranslationEvent::Started { key: k, .. } if &k == key => return,
            _ => {}
        }
    }
}
