use std::env;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdvisorConfigError {
    #[error("invalid advisor base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("advisor base url must be http or https, got {0}")]
    UnsupportedScheme(String),
}

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    pub base_url: Url,
    pub api_key: String,
    pub model: String,
}

impl AdvisorConfig {
    /// # Errors
    ///
    /// Returns `AdvisorConfigError` if `base_url` is not an http(s) URL.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, AdvisorConfigError> {
        let parsed = Url::parse(base_url.trim()).map_err(|source| {
            AdvisorConfigError::InvalidBaseUrl {
                raw: base_url.to_owned(),
                source,
            }
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AdvisorConfigError::UnsupportedScheme(parsed.scheme().to_owned()));
        }
        Ok(Self {
            base_url: parsed,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Reads `CAMPUS_AI_API_KEY`, `CAMPUS_AI_BASE_URL` and `CAMPUS_AI_MODEL`.
    /// A missing or blank key means the advisor is disabled (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// Returns `AdvisorConfigError` if a base URL is set but unusable.
    pub fn from_env() -> Result<Option<Self>, AdvisorConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, AdvisorConfigError> {
        let Some(api_key) = lookup("CAMPUS_AI_API_KEY").filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let base_url = lookup("CAMPUS_AI_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = lookup("CAMPUS_AI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        Self::new(api_key.trim(), &base_url, model).map(Some)
    }

    /// `<base>/chat/completions`, tolerating a trailing slash on the base.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn blank_key_disables_the_advisor() {
        assert!(AdvisorConfig::from_lookup(lookup(&[])).unwrap().is_none());
        assert!(
            AdvisorConfig::from_lookup(lookup(&[("CAMPUS_AI_API_KEY", "  ")]))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn defaults_apply() {
        let config = AdvisorConfig::from_lookup(lookup(&[("CAMPUS_AI_API_KEY", "sk-test")]))
            .unwrap()
            .unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(
            config.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = AdvisorConfig::from_lookup(lookup(&[
            ("CAMPUS_AI_API_KEY", "sk-test"),
            ("CAMPUS_AI_BASE_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AdvisorConfigError::InvalidBaseUrl { .. }));

        let err = AdvisorConfig::new("k", "ftp://example.com", "m").unwrap_err();
        assert!(matches!(err, AdvisorConfigError::UnsupportedScheme(_)));
    }

    #[test]
    fn trailing_slash_is_tolerated() {
        let config = AdvisorConfig::new("k", "http://localhost:8080/v1/", "m").unwrap();
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
