//! Supported translation targets.
//! The catalog is fixed at compile time; its size bounds the fan-out of any
//! bulk translation action.

use serde::Serialize;

/// Language posts are authored in. Never a translation target.
pub const DEFAULT_LANGUAGE: &str = "en";

/// A translation target shown in the admin view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

pub const SUPPORTED_LANGUAGES: [Language; 10] = [
    Language { code: "sv", name: "Svenska", flag: "🇸🇪" },
    Language { code: "da", name: "Dansk", flag: "🇩🇰" },
    Language { code: "no", name: "Norsk", flag: "🇳🇴" },
    Language { code: "fi", name: "Suomi", flag: "🇫🇮" },
    Language { code: "de", name: "Deutsch", flag: "🇩🇪" },
    Language { code: "fr", name: "Français", flag: "🇫🇷" },
    Language { code: "es", name: "Español", flag: "🇪🇸" },
    Language { code: "nl", name: "Nederlands", flag: "🇳🇱" },
    Language { code: "it", name: "Italiano", flag: "🇮🇹" },
    Language { code: "pl", name: "Polski", flag: "🇵🇱" },
];

/// Look up a catalog entry by its code.
pub fn find(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

#[inline]
pub fn is_supported(code: &str) -> bool {
    find(code).is_some()
}

/// All catalog codes, in display order.
pub fn codes() -> impl Iterator<Item = &'static str> {
    SUPPORTED_LANGUAGES.iter().map(|l| l.code)
}
