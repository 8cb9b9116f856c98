// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANGUAGE;

// Language extractor
pub struct Locale(pub String);

impl Locale {
    /// Primary subtag of the first preferred language ("sl-SI" -> "sl").
    pub fn from_header(header_str: &str) -> Option<Self> {
        accept_language::parse(header_str).first().map(|tag_string| {
            let primary = tag_string.split('-').next().unwrap_or(tag_string);
            Locale(primary.to_lowercase())
        })
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANGUAGE.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_primary_subtag_of_preferred_language() {
        let locale = Locale::from_header("en-GB,en;q=0.9,sl;q=0.8").unwrap();
        assert_eq!(locale.0, "en");
    }

    #[test]
    fn empty_header_yields_none() {
        assert!(Locale::from_header("").is_none());
    }
}
