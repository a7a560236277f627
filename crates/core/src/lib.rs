pub mod error;
pub mod gateway;
pub mod llm;
pub mod market;

pub mod config {
    use std::time::Duration;

    const DEFAULT_CSQAQ_BASE_URL: &str = "https://api.csqaq.com/api/v1";
    const DEFAULT_CSQAQ_MIN_INTERVAL_MS: u64 = 1200;
    const DEFAULT_CSQAQ_TIMEOUT_SECS: u64 = 30;

    const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
    const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 120;

    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub csqaq_api_token: String,
        pub csqaq_base_url: String,
        pub csqaq_min_interval: Duration,
        pub csqaq_timeout: Duration,
        pub openai_api_key: Option<String>,
        pub openai_base_url: String,
        pub openai_model: String,
        pub openai_timeout: Duration,
        pub port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self::from_lookup(|key| std::env::var(key).ok()))
        }

        /// Builds settings from an arbitrary key lookup. Missing or unparseable
        /// values fall back to defaults; nothing here is fatal.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
            let parsed_u64 = |key: &str, default: u64| {
                lookup(key)
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(default)
            };

            Self {
                csqaq_api_token: lookup("CSQAQ_API_TOKEN").unwrap_or_default(),
                csqaq_base_url: non_empty("CSQAQ_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CSQAQ_BASE_URL.to_string()),
                csqaq_min_interval: Duration::from_millis(parsed_u64(
                    "CSQAQ_MIN_INTERVAL_MS",
                    DEFAULT_CSQAQ_MIN_INTERVAL_MS,
                )),
                csqaq_timeout: Duration::from_secs(parsed_u64(
                    "CSQAQ_TIMEOUT_SECS",
                    DEFAULT_CSQAQ_TIMEOUT_SECS,
                )),
                openai_api_key: non_empty("OPENAI_API_KEY"),
                openai_base_url: non_empty("OPENAI_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                openai_model: non_empty("OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                openai_timeout: Duration::from_secs(parsed_u64(
                    "OPENAI_TIMEOUT_SECS",
                    DEFAULT_OPENAI_TIMEOUT_SECS,
                )),
                port: lookup("PORT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                sentry_dsn: non_empty("SENTRY_DSN"),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings_from(pairs: &[(&str, &str)]) -> Settings {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| map.get(key).cloned())
        }

        #[test]
        fn defaults_when_environment_is_empty() {
            let s = settings_from(&[]);
            assert_eq!(s.csqaq_api_token, "");
            assert_eq!(s.csqaq_base_url, DEFAULT_CSQAQ_BASE_URL);
            assert_eq!(s.csqaq_min_interval, Duration::from_millis(1200));
            assert_eq!(s.openai_api_key, None);
            assert_eq!(s.openai_model, "gpt-4.1-mini");
            assert_eq!(s.port, 3000);
            assert!(s.sentry_dsn.is_none());
        }

        #[test]
        fn reads_overrides_and_ignores_garbage_numbers() {
            let s = settings_from(&[
                ("CSQAQ_API_TOKEN", "tok"),
                ("CSQAQ_MIN_INTERVAL_MS", "1000"),
                ("CSQAQ_TIMEOUT_SECS", "soon"),
                ("OPENAI_API_KEY", "  "),
                ("OPENAI_API_BASE_URL", "http://llm.local/v1"),
                ("PORT", "8080"),
            ]);
            assert_eq!(s.csqaq_api_token, "tok");
            assert_eq!(s.csqaq_min_interval, Duration::from_millis(1000));
            assert_eq!(s.csqaq_timeout, Duration::from_secs(30));
            assert_eq!(s.openai_api_key, None);
            assert_eq!(s.openai_base_url, "http://llm.local/v1");
            assert_eq!(s.port, 8080);
        }
    }
}
