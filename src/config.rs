//! Application settings.
//!
//! All configuration is read from the environment exactly once at startup
//! into an immutable `Settings` value, then passed by `Arc` into every
//! component. Nothing re-reads the environment mid-request.

use std::str::FromStr;

use crate::error::ConfigError;
use crate::providers::Provider;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub serp_api_key: Option<String>,

    /// Default OpenAI model when the request carries no override.
    pub model: String,
    /// Capacity of the process-wide conversation buffer.
    pub max_messages: usize,
    /// Search-query budget cap for OpenAI runs.
    pub max_searches: usize,
    /// Feature flag for dual search (both engines in parallel).
    pub use_dual_search: bool,

    pub gemini_max_output_tokens: u32,
    /// Per-call wall-clock timeout for Gemini model invocations.
    pub gemini_timeout_secs: u64,
    /// Outer timeout for each side of a dual-synthesis run on Gemini.
    pub gemini_request_timeout_secs: u64,
    pub gemini_max_retries: u32,
    /// Search-query budget cap for Gemini runs (quota management).
    pub gemini_max_searches: usize,

    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            tavily_api_key: None,
            serp_api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            max_messages: 12,
            max_searches: 12,
            use_dual_search: true,
            gemini_max_output_tokens: 2048,
            gemini_timeout_secs: 30,
            gemini_request_timeout_secs: 45,
            gemini_max_retries: 1,
            gemini_max_searches: 4,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env_opt(name).map(|raw| raw.parse::<T>()) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            tracing::warn!(var = name, "unparseable value, keeping default");
            default
        }
        None => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_opt(name).as_deref().map(parse_bool) {
        Some(Some(value)) => value,
        Some(None) => {
            tracing::warn!(var = name, "unparseable value, keeping default");
            default
        }
        None => default,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            openai_api_key: env_opt("OPENAI_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            tavily_api_key: env_opt("TAVILY_API_KEY"),
            serp_api_key: env_opt("SERP_API_KEY"),
            model: env_opt("MODEL").unwrap_or(defaults.model),
            max_messages: env_parse("MAX_MESSAGES", defaults.max_messages),
            max_searches: env_parse("MAX_SEARCHES", defaults.max_searches),
            use_dual_search: env_bool("USE_DUAL_SEARCH", defaults.use_dual_search),
            gemini_max_output_tokens: env_parse(
                "GEMINI_MAX_OUTPUT_TOKENS",
                defaults.gemini_max_output_tokens,
            ),
            gemini_timeout_secs: env_parse("GEMINI_TIMEOUT_SECONDS", defaults.gemini_timeout_secs),
            gemini_request_timeout_secs: env_parse(
                "GEMINI_REQUEST_TIMEOUT",
                defaults.gemini_request_timeout_secs,
            ),
            gemini_max_retries: env_parse("GEMINI_MAX_RETRIES", defaults.gemini_max_retries),
            gemini_max_searches: env_parse("GEMINI_MAX_SEARCHES", defaults.gemini_max_searches),
            bind_addr: env_opt("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    /// Resolve the requested model provider against available credentials.
    ///
    /// One-way fallback: Gemini without a key falls back to OpenAI; OpenAI
    /// without a key is a hard error regardless of Gemini's credential.
    /// Idempotent, so each phase may call it again on possibly-rewritten
    /// state.
    pub fn resolve_provider(&self, requested: Provider) -> Result<Provider, ConfigError> {
        match requested {
            Provider::Gemini => {
                if self.gemini_api_key.is_some() {
                    return Ok(Provider::Gemini);
                }
                tracing::warn!("GEMINI_API_KEY not found, falling back to openai");
                if self.openai_api_key.is_none() {
                    return Err(ConfigError::MissingCredential(
                        "cannot use gemini (no GEMINI_API_KEY) and cannot fall back to openai \
                         (no OPENAI_API_KEY); provide at least one API key"
                            .to_string(),
                    ));
                }
                Ok(Provider::OpenAi)
            }
            Provider::OpenAi => {
                if self.openai_api_key.is_none() {
                    return Err(ConfigError::MissingCredential(
                        "OPENAI_API_KEY is required".to_string(),
                    ));
                }
                Ok(Provider::OpenAi)
            }
        }
    }

    /// Search has no fallback engine; the Tavily credential is mandatory.
    pub fn validate_search_requirements(&self) -> Result<(), ConfigError> {
        if self.tavily_api_key.is_none() {
            return Err(ConfigError::MissingCredential(
                "TAVILY_API_KEY is required for search".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_gemini(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    pub fn has_tavily(&self) -> bool {
        self.tavily_api_key.is_some()
    }

    pub fn has_serp(&self) -> bool {
        self.serp_api_key.is_some()
    }

    pub fn can_use_dual_search(&self) -> bool {
        self.use_dual_search && self.has_tavily() && self.has_serp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_keys(openai: bool, gemini: bool) -> Settings {
        Settings {
            openai_api_key: openai.then(|| "sk-test".to_string()),
            gemini_api_key: gemini.then(|| "gm-test".to_string()),
            ..Settings::default()
        }
    }

    #[test]
    fn gemini_falls_back_to_openai_when_key_absent() {
        let settings = with_keys(true, false);
        assert_eq!(
            settings.resolve_provider(Provider::Gemini),
            Ok(Provider::OpenAi)
        );
    }

    #[test]
    fn gemini_with_key_is_kept() {
        let settings = with_keys(true, true);
        assert_eq!(
            settings.resolve_provider(Provider::Gemini),
            Ok(Provider::Gemini)
        );
    }

    #[test]
    fn no_keys_at_all_is_a_credential_error() {
        let settings = with_keys(false, false);
        assert!(settings.resolve_provider(Provider::Gemini).is_err());
    }

    #[test]
    fn openai_has_no_fallback_path() {
        // A Gemini key does not rescue a missing OpenAI key.
        let settings = with_keys(false, true);
        assert!(settings.resolve_provider(Provider::OpenAi).is_err());
    }

    #[test]
    fn resolution_is_idempotent() {
        let settings = with_keys(true, false);
        let first = settings.resolve_provider(Provider::Gemini).unwrap();
        assert_eq!(settings.resolve_provider(first), Ok(first));
    }

    #[test]
    fn search_requires_tavily_key() {
        let settings = Settings::default();
        assert!(settings.validate_search_requirements().is_err());

        let settings = Settings {
            tavily_api_key: Some("tvly-test".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate_search_requirements().is_ok());
    }

    #[test]
    fn dual_search_needs_flag_and_both_engine_keys() {
        let mut settings = Settings {
            tavily_api_key: Some("tvly-test".to_string()),
            serp_api_key: Some("serp-test".to_string()),
            ..Settings::default()
        };
        assert!(settings.can_use_dual_search());

        settings.use_dual_search = false;
        assert!(!settings.can_use_dual_search());

        settings.use_dual_search = true;
        settings.serp_api_key = None;
        assert!(!settings.can_use_dual_search());
    }

    #[test]
    fn bool_parsing_accepts_only_explicit_values() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        // Garbage is neither true nor false; callers keep the default.
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
