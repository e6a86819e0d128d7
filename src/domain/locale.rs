//! Supported locale codes and their backend equivalents.

use super::error::DomainError;

/// Built-in mapping from API locale codes to backend (NLLB-style) codes.
pub const DEFAULT_LOCALE_CODES: &[(&str, &str)] = &[
    ("en", "eng_Latn"),
    ("es", "spa_Latn"),
    ("fr", "fra_Latn"),
    ("de", "deu_Latn"),
    ("it", "ita_Latn"),
    ("pt", "por_Latn"),
    ("ru", "rus_Cyrl"),
    ("zh", "zho_Hans"),
    ("ja", "jpn_Jpan"),
    ("ko", "kor_Hang"),
    ("ar", "arb_Arab"),
    ("hi", "hin_Deva"),
    ("nl", "nld_Latn"),
    ("pl", "pol_Latn"),
    ("tr", "tur_Latn"),
    ("vi", "vie_Latn"),
    ("th", "tha_Thai"),
    ("sv", "swe_Latn"),
    ("cs", "ces_Latn"),
    ("el", "ell_Grek"),
];

/// Immutable set of supported locales, loaded once at startup.
///
/// Entries keep the order they were configured in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTable {
    entries: Vec<(String, String)>,
}

impl LocaleTable {
    pub fn new(
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, DomainError> {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (code, backend) in entries {
            validate_code(&code)?;
            validate_code(&backend)?;
            if table.contains(&code) {
                return Err(DomainError::invalid_locale_code(code, "listed more than once"));
            }
            table.entries.push((code, backend));
        }
        if table.is_empty() {
            return Err(DomainError::EmptyLocaleTable);
        }
        Ok(table)
    }

    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_LOCALE_CODES
                .iter()
                .map(|(code, backend)| (code.to_string(), backend.to_string()))
                .collect(),
        }
    }

    pub fn backend_code(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == code)
            .map(|(_, backend)| backend.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.backend_code(code).is_some()
    }

    /// Supported API locale codes in table order.
    pub fn codes(&self) -> Vec<&str> {
        self.entries.iter().map(|(code, _)| code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a source/target pair, failing on the first unsupported code.
    pub fn resolve_pair(&self, source: &str, target: &str) -> Result<LocalePair, DomainError> {
        let backend_source = self
            .backend_code(source)
            .ok_or_else(|| DomainError::unsupported_locale(source))?;
        let backend_target = self
            .backend_code(target)
            .ok_or_else(|| DomainError::unsupported_locale(target))?;

        Ok(LocalePair {
            source: source.to_string(),
            target: target.to_string(),
            backend_source: backend_source.to_string(),
            backend_target: backend_target.to_string(),
        })
    }
}

/// A validated language pair carrying both the API and the backend codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePair {
    pub source: String,
    pub target: String,
    pub backend_source: String,
    pub backend_target: String,
}

fn validate_code(code: &str) -> Result<(), DomainError> {
    if code.is_empty() {
        return Err(DomainError::invalid_locale_code(code, "code must not be empty"));
    }
    if !code
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(DomainError::invalid_locale_code(
            code,
            "only ASCII letters, digits, `_` and `-` are allowed",
        ));
    }
    Ok(())
}
