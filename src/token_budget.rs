//! Translation model catalog and output-size estimate.
//! Advisory only: the admin view uses it to disable AI actions, the manager
//! never refuses a request because of it.

use serde::Serialize;

/// Rough average for Latin-script HTML content.
pub const AVG_CHARS_PER_TOKEN: usize = 4;

/// Model used when a post has no explicit selection.
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

/// A model the gate can be asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranslationModel {
    pub id: &'static str,
    pub label: &'static str,
    pub max_output_tokens: usize,
}

pub const MODELS: [TranslationModel; 3] = [
    TranslationModel {
        id: "claude-3-5-haiku-20241022",
        label: "Claude 3.5 Haiku",
        max_output_tokens: 8_192,
    },
    TranslationModel {
        id: "claude-3-haiku-20240307",
        label: "Claude 3 Haiku",
        max_output_tokens: 4_096,
    },
    TranslationModel {
        id: "claude-sonnet-4-20250514",
        label: "Claude Sonnet 4",
        max_output_tokens: 64_000,
    },
];

pub fn find_model(id: &str) -> Option<&'static TranslationModel> {
    MODELS.iter().find(|m| m.id == id)
}

/// Estimated token count: characters / [`AVG_CHARS_PER_TOKEN`], rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(AVG_CHARS_PER_TOKEN)
}

/// Outcome of comparing a post's estimate against a model's output limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCheck {
    pub estimated_tokens: usize,
    /// `None` for models missing from the catalog.
    pub max_output_tokens: Option<usize>,
}

impl BudgetCheck {
    /// Unknown models are never flagged; the gate decides for them.
    pub fn exceeds(&self) -> bool {
        self.max_output_tokens
            .is_some_and(|max| self.estimated_tokens > max)
    }
}

pub fn check(text: &str, model_id: &str) -> BudgetCheck {
    BudgetCheck {
        estimated_tokens: estimate_tokens(text),
        max_output_tokens: find_model(model_id).map(|m| m.max_output_tokens),
    }
}
