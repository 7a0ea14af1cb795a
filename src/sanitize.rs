//! Cleans HTML pasted into the post editor (typically from Word) down to a
//! small set of formatting tags.
//!
//! Pipeline: Word comments and Office namespaced tags are stripped and
//! `b`/`i` renamed with regexes, then `ammonia` enforces the allow-list on a
//! real HTML parse, then whitespace and empty paragraphs are collapsed.

use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::UrlRelative;
use regex::{Captures, Regex};

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "u", "ul", "ol", "li", "h1", "h2", "h3", "h4", "a", "blockquote",
];

/// Dropped together with their content.
const CONTENT_TAGS: &[&str] = &["script", "style", "xml", "head", "title"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

pub struct PasteSanitizer {
    comments: Regex,
    office_tags: Regex,
    legacy_tags: Regex,
    nbsp: Regex,
    spaces: Regex,
    empty_paragraph: Regex,
    blank_lines: Regex,
    cleaner: ammonia::Builder<'static>,
}

impl PasteSanitizer {
    pub fn new() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("sanitizer pattern must compile");

        let mut cleaner = ammonia::Builder::empty();
        cleaner
            .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
            .clean_content_tags(CONTENT_TAGS.iter().copied().collect::<HashSet<_>>())
            .add_tag_attributes("a", &["href"])
            .url_schemes(URL_SCHEMES.iter().copied().collect::<HashSet<_>>())
            .url_relative(UrlRelative::Deny)
            .link_rel(None)
            .strip_comments(true);

        Self {
            // Covers Word's <!--[if gte mso 9]>...<![endif]--> as well.
            comments: re(r"(?s)<!--.*?-->|<!\[if[^>]*>|<!\[endif\]>"),
            office_tags: re(r"(?i)</?[a-z]+:[a-z0-9]+\b[^>]*>"),
            legacy_tags: re(r"(?i)<(/?)(b|i)\b[^>]*>"),
            nbsp: re(r"(?i)&nbsp;|\u{a0}"),
            spaces: re(r"[ \t]{2,}"),
            empty_paragraph: re(r"(?i)<p>\s*(?:<br>\s*)*</p>"),
            blank_lines: re(r"\n\s*\n(?:\s*\n)+"),
            cleaner,
        }
    }

    pub fn sanitize(&self, html: &str) -> String {
        let out = self.comments.replace_all(html, "");
        let out = self.office_tags.replace_all(&out, "");
        let out = self.legacy_tags.replace_all(&out, |caps: &Captures<'_>| {
            let name = if caps[2].eq_ignore_ascii_case("b") { "strong" } else { "em" };
            format!("<{}{name}>", &caps[1])
        });

        // Unterminated or malformed tags are resolved by the parser here,
        // never passed through as text that could turn into markup later.
        let out = self.cleaner.clean(&out).to_string();

        let out = self.nbsp.replace_all(&out, " ");
        let out = self.spaces.replace_all(&out, " ");
        let out = self.empty_paragraph.replace_all(&out, "");
        let out = self.blank_lines.replace_all(&out, "\n\n");
        out.trim().to_string()
    }
}

impl Default for PasteSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize with a process-wide sanitizer instance.
pub fn sanitize_pasted_html(html: &str) -> String {
    static SANITIZER: OnceLock<PasteSanitizer> = OnceLock::new();
    SANITIZER.get_or_init(PasteSanitizer::new).sanitize(html)
}
