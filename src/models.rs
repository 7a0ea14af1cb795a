//! Content rows shared by the manager, the store and the admin view.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Publication state of a default-language post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

/// A unit of publishable content in the default language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    /// Unique within its language.
    pub slug: String,
    /// Rich text (HTML).
    pub content: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Text the gate has to translate, used for the token estimate.
    pub fn translatable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.content.len() + self.excerpt.as_ref().map_or(0, |e| e.len()) + 2,
        );
        text.push_str(&self.title);
        text.push('\n');
        if let Some(excerpt) = &self.excerpt {
            text.push_str(excerpt);
            text.push('\n');
        }
        text.push_str(&self.content);
        text
    }
}

/// Row-level translation status as persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    Pending,
    Completed,
    Failed,
}

impl TranslationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TranslationStatus::Pending => "pending",
            TranslationStatus::Completed => "completed",
            TranslationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TranslationStatus::Pending),
            "completed" => Some(TranslationStatus::Completed),
            "failed" => Some(TranslationStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (post, language) localized rendition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: String,
    pub post_id: String,
    pub language_code: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub status: TranslationStatus,
    pub is_machine_translated: bool,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Translation {
    pub fn key(&self) -> TranslationKey {
        TranslationKey::new(&self.post_id, &self.language_code)
    }
}

/// Fields for inserting a translation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTranslation {
    pub post_id: String,
    pub language_code: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub status: TranslationStatus,
    pub is_machine_translated: bool,
    pub is_published: bool,
}

impl NewTranslation {
    /// A human-authored, completed, unpublished translation.
    pub fn manual(post_id: &str, language_code: &str, title: &str, slug: &str, content: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            language_code: language_code.to_string(),
            title: title.to_string(),
            slug: slug.to_string(),
            content: content.to_string(),
            excerpt: None,
            meta_title: None,
            meta_description: None,
            status: TranslationStatus::Completed,
            is_machine_translated: false,
            is_published: false,
        }
    }

    pub fn key(&self) -> TranslationKey {
        TranslationKey::new(&self.post_id, &self.language_code)
    }
}

/// Editable fields of an existing translation. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationEdit {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Identity of one translation slot.
///
/// Kept as a pair rather than a joined string so ids containing `-` cannot
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TranslationKey {
    pub post_id: String,
    pub language: String,
}

impl TranslationKey {
    pub fn new(post_id: &str, language: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            language: language.to_string(),
        }
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.post_id, self.language)
    }
}

/// Current time as Unix timestamp (milliseconds).
pub fn now_unix_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_with_hyphens_do_not_collide() {
        let a = TranslationKey::new("post-a", "b");
        let b = TranslationKey::new("post", "a-b");
        assert_eq!(a.to_string(), b.to_string());
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            TranslationStatus::Pending,
            TranslationStatus::Completed,
            TranslationStatus::Failed,
        ] {
            assert_eq!(TranslationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TranslationStatus::parse("done"), None);
    }

    #[test]
    fn translatable_text_skips_missing_excerpt() {
        let post = Post {
            id: "p1".into(),
            title: "Title".into(),
            slug: "title".into(),
            content: "<p>Body</p>".into(),
            excerpt: None,
            status: PostStatus::Published,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(post.translatable_text(), "Title\n<p>Body</p>");
    }
}
