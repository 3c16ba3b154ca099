//! Static language catalog

/// Supported target languages, in presentation order.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("ru", "Русский"),
    ("en", "Английский"),
    ("es", "Испанский"),
    ("fr", "Французский"),
    ("de", "Немецкий"),
    ("it", "Итальянский"),
    ("zh", "Китайский"),
    ("ja", "Японский"),
    ("ko", "Корейский"),
];

/// Subset offered as picker buttons after `/translate`.
pub const POPULAR_LANGUAGES: &[&str] = &["ru", "en", "es", "fr", "de", "it"];

/// Target of the quick-translate fast path.
pub const QUICK_TRANSLATE_LANG: &str = "ru";

/// Display name of a known language code.
#[must_use]
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Display name with the raw code as fallback for unknown picks.
#[must_use]
pub fn display_name(code: &str) -> String {
    language_name(code).map_or_else(|| code.to_string(), ToString::to_string)
}
