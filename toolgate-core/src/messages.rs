// toolgate-core/src/messages.rs
// ============================================================================
// Module: Localized Message Bundle
// Description: Embedded en/ru catalog for user-facing limit messages.
// Purpose: Centralize denial wording so approvers stay language-neutral.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The limits approver reports denials with localized messages. Catalogs are
//! embedded per language and rendered with `{placeholder}` substitution.
//! Missing keys fall back to English and then to the key itself, so a stale
//! catalog can never turn a denial into a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Language Selection
// ============================================================================

/// Supported message languages.
///
/// # Invariants
/// - [`Lang::En`] is the default fallback language.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Lang {
    /// English (default).
    #[default]
    En,
    /// Russian.
    Ru,
}

impl Lang {
    /// Returns the canonical language label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    /// Parses a language value, defaulting to English for unknown input.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ru" => Self::Ru,
            _ => Self::En,
        }
    }
}

// ============================================================================
// SECTION: Catalogs
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("limits.max_total", "Maximum number of calls exceeded"),
    ("limits.rate_limit", "Rate limit exceeded"),
    ("limits.field_regex", "Field {field} does not match required format"),
    ("limits.field_min", "Field {field} is below minimum value {min}"),
    ("limits.field_max", "Field {field} is above maximum value {max}"),
    ("limits.field_min_length", "Field {field} is too short (minimum {min_length} characters)"),
    ("limits.field_max_length", "Field {field} is too long (maximum {max_length} characters)"),
];

/// Russian catalog entries.
const CATALOG_RU: &[(&str, &str)] = &[
    ("limits.max_total", "Превышено максимальное количество вызовов"),
    ("limits.rate_limit", "Превышен лимит частоты запросов"),
    ("limits.field_regex", "Поле {field} не соответствует требуемому формату"),
    ("limits.field_min", "Поле {field} меньше минимального значения {min}"),
    ("limits.field_max", "Поле {field} больше максимального значения {max}"),
    ("limits.field_min_length", "Поле {field} слишком короткое (минимум {min_length} символов)"),
    ("limits.field_max_length", "Поле {field} слишком длинное (максимум {max_length} символов)"),
];

/// Returns the catalog map for the requested language.
fn catalog_for(lang: Lang) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_RU_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match lang {
        Lang::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Lang::Ru => CATALOG_RU_MAP.get_or_init(|| CATALOG_RU.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Bundle
// ============================================================================

/// Message bundle bound to one language.
#[derive(Debug, Clone, Copy)]
pub struct MessageBundle {
    /// Selected language.
    lang: Lang,
}

impl MessageBundle {
    /// Creates a bundle for the given language.
    #[must_use]
    pub const fn new(lang: Lang) -> Self {
        Self {
            lang,
        }
    }

    /// Returns the bundle language.
    #[must_use]
    pub const fn lang(&self) -> Lang {
        self.lang
    }

    /// Renders `key` with `{placeholder}` substitution.
    #[must_use]
    pub fn render(&self, key: &str, args: &[(&str, String)]) -> String {
        let template = catalog_for(self.lang)
            .get(key)
            .copied()
            .or_else(|| catalog_for(Lang::En).get(key).copied())
            .unwrap_or(key);
        let mut result = template.to_string();
        for (name, value) in args {
            let placeholder = format!("{{{name}}}");
            result = result.replace(&placeholder, value);
        }
        result
    }
}

impl Default for MessageBundle {
    fn default() -> Self {
        Self::new(Lang::En)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::Lang;
    use super::MessageBundle;

    #[test]
    fn renders_placeholders() {
        let bundle = MessageBundle::new(Lang::En);
        let message =
            bundle.render("limits.field_min", &[("field", "n".to_string()), ("min", "3".to_string())]);
        assert_eq!(message, "Field n is below minimum value 3");
    }

    #[test]
    fn russian_catalog_is_selected() {
        let bundle = MessageBundle::new(Lang::Ru);
        assert_eq!(
            bundle.render("limits.max_total", &[]),
            "Превышено максимальное количество вызовов"
        );
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        let bundle = MessageBundle::new(Lang::Ru);
        assert_eq!(bundle.render("limits.unknown", &[]), "limits.unknown");
    }

    #[test]
    fn parse_defaults_to_english() {
        assert_eq!(Lang::parse("RU"), Lang::Ru);
        assert_eq!(Lang::parse("en"), Lang::En);
        assert_eq!(Lang::parse("de"), Lang::En);
        assert_eq!(Lang::parse(""), Lang::En);
    }
}
