use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unsupported locale `{code}`")]
    UnsupportedLocale { code: String },
    #[error("invalid locale code `{code}`: {reason}")]
    InvalidLocaleCode { code: String, reason: &'static str },
    #[error("locale table must contain at least one entry")]
    EmptyLocaleTable,
}

impl DomainError {
    pub fn unsupported_locale(code: impl Into<String>) -> Self {
        Self::UnsupportedLocale { code: code.into() }
    }

    pub fn invalid_locale_code(code: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidLocaleCode {
            code: code.into(),
            reason,
        }
    }
}
