//! Translations admin view: derives one cell state per published post and
//! supported language from the manager's snapshot, and dispatches user
//! actions back into the manager. It never touches the key sets itself.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::languages::{Language, SUPPORTED_LANGUAGES};
use crate::manager::{ManagerError, ManagerSnapshot, TranslationManager, TriggerReport};
use crate::models::{Post, TranslationKey, TranslationStatus};
use crate::token_budget::{self, BudgetCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Available,
    AvailableUnpublished,
    Creating,
    Retrying,
    Failed,
    NotTranslated,
}

impl CellState {
    pub fn label(self) -> &'static str {
        match self {
            CellState::Available => "Available",
            CellState::AvailableUnpublished => "Available (unpublished)",
            CellState::Creating => "Creating…",
            CellState::Retrying => "Retrying…",
            CellState::Failed => "Failed",
            CellState::NotTranslated => "Not translated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAction {
    Edit,
    View,
    Publish,
    Unpublish,
    Delete,
    Cancel,
    Retry,
    AiTranslate,
    ManualEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSlot {
    pub action: CellAction,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub language: Language,
    pub state: CellState,
    pub translation_id: Option<String>,
    pub actions: Vec<ActionSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRow {
    pub post_id: String,
    pub title: String,
    pub model: String,
    pub budget: BudgetCheck,
    pub cells: Vec<Cell>,
    pub missing: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl PostRow {
    pub fn cell(&self, language: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.language.code == language)
    }

    pub fn can_create_missing(&self) -> bool {
        !self.missing.is_empty() && !self.budget.exceeds()
    }
}

/// Derive the cell state for one slot. Conditions are checked in a fixed
/// order; a persisted row always wins over transient markers.
pub fn cell_state(snapshot: &ManagerSnapshot, key: &TranslationKey) -> CellState {
    let row = snapshot.row_for(key);

    if let Some(row) = row {
        if row.status == TranslationStatus::Completed {
            return if row.is_published {
                CellState::Available
            } else {
                CellState::AvailableUnpublished
            };
        }
    }
    if snapshot.retrying.contains(key) {
        return CellState::Retrying;
    }
    if snapshot.translating.contains(key) {
        return CellState::Creating;
    }
    if row.is_some_and(|r| r.status == TranslationStatus::Failed) {
        return CellState::Failed;
    }
    if row.is_none() && snapshot.failed_translations.contains(key) {
        return CellState::Failed;
    }
    CellState::NotTranslated
}

fn actions_for(state: CellState, translating: bool, over_budget: bool) -> Vec<ActionSlot> {
    let on = |action| ActionSlot { action, enabled: true };
    match state {
        CellState::Available => vec![
            on(CellAction::Edit),
            on(CellAction::View),
            on(CellAction::Unpublish),
            on(CellAction::Delete),
        ],
        CellState::AvailableUnpublished => vec![
            on(CellAction::Edit),
            on(CellAction::Publish),
            on(CellAction::Delete),
        ],
        CellState::Creating | CellState::Retrying if translating => vec![on(CellAction::Cancel)],
        CellState::Creating | CellState::Retrying => Vec::new(),
        CellState::Failed => vec![on(CellAction::Retry)],
        CellState::NotTranslated => vec![
            ActionSlot {
                action: CellAction::AiTranslate,
                enabled: !over_budget,
            },
            on(CellAction::ManualEntry),
        ],
    }
}

fn build_row(post: &Post, model: String, snapshot: &ManagerSnapshot) -> PostRow {
    let budget = token_budget::check(&post.translatable_text(), &model);
    let mut cells = Vec::with_capacity(SUPPORTED_LANGUAGES.len());
    let mut missing = Vec::new();
    let mut failed = Vec::new();

    for language in SUPPORTED_LANGUAGES {
        let key = TranslationKey::new(&post.id, language.code);
        let row = snapshot.row_for(&key);
        let translating = snapshot.translating.contains(&key);
        let state = cell_state(snapshot, &key);

        if row.is_none() && !translating {
            missing.push(language.code);
        }
        if snapshot.failed_translations.contains(&key) {
            failed.push(language.code);
        }

        cells.push(Cell {
            language,
            state,
            translation_id: row.map(|r| r.id.clone()),
            actions: actions_for(state, translating, budget.exceeds()),
        });
    }

    PostRow {
        post_id: post.id.clone(),
        title: post.title.clone(),
        model,
        budget,
        cells,
        missing,
        failed,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error("post {post_id} needs ~{estimated} output tokens, model allows {max}")]
    BudgetExceeded {
        post_id: String,
        estimated: usize,
        max: usize,
    },
    #[error("translation {0} is not in the current snapshot")]
    UnknownTranslation(String),
}

/// User actions the view dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    Translate { post_id: String, language: String },
    CreateAllMissing { post_id: String },
    Retry { post_id: String, language: String },
    RetryAllFailed { post_id: String },
    Cancel { post_id: String, language: String },
    TogglePublish { translation_id: String },
    Delete { translation_id: String },
    SelectModel { post_id: String, model: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

pub struct TranslationsView {
    manager: Arc<TranslationManager>,
}

impl TranslationsView {
    pub fn new(manager: Arc<TranslationManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<TranslationManager> {
        &self.manager
    }

    /// Rows for every published post, in post-list order.
    pub fn board(&self) -> Vec<PostRow> {
        let snapshot = self.manager.snapshot();
        self.manager
            .posts()
            .iter()
            .filter(|p| p.is_published())
            .map(|p| build_row(p, self.manager.model_for(&p.id), &snapshot))
            .collect()
    }

    pub fn row(&self, post_id: &str) -> Option<PostRow> {
        let post = self.manager.post(post_id)?;
        Some(build_row(&post, self.manager.model_for(post_id), &self.manager.snapshot()))
    }

    fn require_budget(&self, post_id: &str) -> Result<PostRow, ViewError> {
        let row = self
            .row(post_id)
            .ok_or_else(|| ManagerError::PostNotFound(post_id.to_string()))?;
        if row.budget.exceeds() {
            return Err(ViewError::BudgetExceeded {
                post_id: post_id.to_string(),
                estimated: row.budget.estimated_tokens,
                max: row.budget.max_output_tokens.unwrap_or_default(),
            });
        }
        Ok(row)
    }

    /// Single-language AI translate button.
    pub async fn translate(&self, post_id: &str, language: &str) -> Result<TriggerReport, ViewError> {
        self.require_budget(post_id)?;
        Ok(self.manager.trigger_translation(post_id, &[language]).await?)
    }

    /// One trigger call with every language that has neither a row nor a
    /// pending request. `None` when nothing is missing.
    pub async fn create_all_missing(&self, post_id: &str) -> Result<Option<TriggerReport>, ViewError> {
        let row = self.require_budget(post_id)?;
        if row.missing.is_empty() {
            return Ok(None);
        }
        info!(post_id, languages = ?row.missing, "creating all missing translations");
        Ok(Some(self.manager.trigger_translation(post_id, &row.missing).await?))
    }

    /// One retry per failed key of the post, in catalog order.
    pub async fn retry_all_failed(&self, post_id: &str) -> Result<Vec<TriggerReport>, ViewError> {
        let row = self
            .row(post_id)
            .ok_or_else(|| ManagerError::PostNotFound(post_id.to_string()))?;

        let mut reports = Vec::with_capacity(row.failed.len());
        for language in row.failed {
            reports.push(self.manager.retry_translation(post_id, language).await?);
        }
        Ok(reports)
    }

    /// Run an action and describe its outcome. Errors become error notices;
    /// nothing is assumed to have persisted when the store refused it.
    pub async fn dispatch(&self, action: ViewAction) -> Notice {
        match self.run(action).await {
            Ok(notice) => notice,
            Err(e) => {
                warn!(error = %e, "admin action failed");
                Notice::error(e.to_string())
            }
        }
    }

    async fn run(&self, action: ViewAction) -> Result<Notice, ViewError> {
        match action {
            ViewAction::Translate { post_id, language } => {
                let report = self.translate(&post_id, &language).await?;
                Ok(report_notice(&report))
            }
            ViewAction::CreateAllMissing { post_id } => match self.create_all_missing(&post_id).await? {
                Some(report) => Ok(report_notice(&report)),
                None => Ok(Notice::info("All translations already exist")),
            },
            ViewAction::Retry { post_id, language } => {
                let report = self.manager.retry_translation(&post_id, &language).await?;
                Ok(report_notice(&report))
            }
            ViewAction::RetryAllFailed { post_id } => {
                let reports = self.retry_all_failed(&post_id).await?;
                let failed: usize = reports.iter().map(|r| r.failed().count()).sum();
                if reports.is_empty() {
                    Ok(Notice::info("Nothing to retry"))
                } else if failed == 0 {
                    Ok(Notice::success(format!("Retried {} translations", reports.len())))
                } else {
                    Ok(Notice::error(format!("{failed} of {} retries failed", reports.len())))
                }
            }
            ViewAction::Cancel { post_id, language } => {
                self.manager.cancel_pending_translation(&post_id, &language)?;
                Ok(Notice::info(format!("Cancelled {language} translation")))
            }
            ViewAction::TogglePublish { translation_id } => {
                let current = self
                    .manager
                    .translations()
                    .into_iter()
                    .find(|t| t.id == translation_id)
                    .map(|t| t.is_published)
                    .ok_or_else(|| ViewError::UnknownTranslation(translation_id.clone()))?;
                self.manager
                    .toggle_translation_status(&translation_id, current)
                    .await?;
                Ok(Notice::success(if current {
                    "Translation unpublished"
                } else {
                    "Translation published"
                }))
            }
            ViewAction::Delete { translation_id } => {
                self.manager.delete_translation(&translation_id).await?;
                Ok(Notice::success("Translation deleted"))
            }
            ViewAction::SelectModel { post_id, model } => {
                self.manager.set_model(&post_id, model.as_str());
                Ok(Notice::info(format!("Model set to {model}")))
            }
        }
    }
}

fn report_notice(report: &TriggerReport) -> Notice {
    let failed: Vec<&str> = report.failed().collect();
    let requested = report.requested().count();
    if !failed.is_empty() {
        Notice::error(format!("Translation failed for {}", failed.join(", ")))
    } else if requested == 0 {
        Notice::info("Translations already exist")
    } else {
        Notice::success(format!("Created {requested} translation(s)"))
    }
}
