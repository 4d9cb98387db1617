use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Everything a run can be tuned with; each section may be omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Upstream endpoints, HTTP behaviour and request pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host serving the daily price series (`siseJson.naver`).
    #[serde(default = "default_chart_url")]
    pub chart_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Screening run tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum number of in-flight upstream requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Trailing calendar days requested for the price series (52-week high).
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default)]
    pub candidate_limit: Option<usize>,

    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://finance.naver.com".to_string()
}
fn default_chart_url() -> String {
    "https://api.finance.naver.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_request_delay_ms() -> u64 {
    150
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    250
}
fn default_backoff_max_ms() -> u64 {
    4000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) flow-screener/0.1".to_string()
}
fn default_concurrency() -> usize {
    4
}
fn default_lookback_days() -> i64 {
    365
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chart_url: default_chart_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            lookback_days: default_lookback_days(),
            candidate_limit: None,
            run_timeout_secs: None,
        }
    }
}


impl AppConfig {
    /// `.env`, then `config/default.toml`, then `config/local.toml`, then
    /// `SCREENER__SECTION__KEY` environment variables; later sources win.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCREENER").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(app_cfg)
    }
}

impl PipelineConfig {
    /// Worker pool size; a zero from config would deadlock the semaphore.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nconcurrency = 8\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.pipeline.concurrency, 8);
        assert_eq!(cfg.pipeline.lookback_days, 365);
        assert_eq!(cfg.scraper.base_url, "https://finance.naver.com");
        assert_eq!(cfg.scraper.max_retries, 3);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let cfg = PipelineConfig { concurrency: 0, ..PipelineConfig::default() };
        assert_eq!(cfg.effective_concurrency(), 1);
    }
}
