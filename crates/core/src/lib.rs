pub mod allocation;
pub mod domain;
pub mod optimizer;
pub mod projection;
pub mod questionnaire;
pub mod session;

pub mod config {
    const DEFAULT_OPTIMIZER_BASE_URL: &str = "http://localhost:8000";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub optimizer_base_url: Option<String>,
        pub optimizer_api_key: Option<String>,
        pub optimizer_timeout_secs: Option<u64>,
        pub optimizer_retries: Option<u32>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                optimizer_base_url: non_empty_var("OPTIMIZER_BASE_URL"),
                optimizer_api_key: non_empty_var("OPTIMIZER_API_KEY"),
                optimizer_timeout_secs: parsed_var("OPTIMIZER_TIMEOUT_SECS")?,
                optimizer_retries: parsed_var("OPTIMIZER_RETRIES")?,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn optimizer_base_url(&self) -> &str {
            self.optimizer_base_url
                .as_deref()
                .unwrap_or(DEFAULT_OPTIMIZER_BASE_URL)
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        use anyhow::Context;

        non_empty_var(key)
            .map(|s| s.parse::<T>().with_context(|| format!("{key} is invalid: {s}")))
            .transpose()
    }
}
