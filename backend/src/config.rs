use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Settings for the ticker-market quote adapter.
#[derive(Debug, Clone)]
pub struct QuoteAdapterConfig {
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl Default for QuoteAdapterConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(15),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for the scraped fundamentals adapter.
#[derive(Debug, Clone)]
pub struct FundamentalsAdapterConfig {
    pub cache_ttl: Duration,
    pub timeout: Duration,
    /// Paid once before every cache miss, to stay under the site's abuse protection.
    pub cold_call_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for FundamentalsAdapterConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            timeout: Duration::from_secs(20),
            cold_call_delay: Duration::from_millis(1500),
            max_retries: 1,
            retry_backoff: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub portfolio_path: PathBuf,
    pub quote_concurrency: usize,
    pub fundamentals_concurrency: usize,
    pub quote: QuoteAdapterConfig,
    pub fundamentals: FundamentalsAdapterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            portfolio_path: PathBuf::from("./portfolio.xlsx"),
            quote_concurrency: 2,
            fundamentals_concurrency: 2,
            quote: QuoteAdapterConfig::default(),
            fundamentals: FundamentalsAdapterConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            portfolio_path: lookup("PORTFOLIO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.portfolio_path),
            quote_concurrency: parse_or(&lookup, "QUOTE_CONCURRENCY", defaults.quote_concurrency)?,
            fundamentals_concurrency: parse_or(
                &lookup,
                "FUNDAMENTALS_CONCURRENCY",
                defaults.fundamentals_concurrency,
            )?,
            quote: QuoteAdapterConfig {
                cache_ttl: secs_or(&lookup, "QUOTE_CACHE_TTL_SECS", defaults.quote.cache_ttl)?,
                timeout: secs_or(&lookup, "QUOTE_TIMEOUT_SECS", defaults.quote.timeout)?,
            },
            fundamentals: FundamentalsAdapterConfig {
                cache_ttl: secs_or(
                    &lookup,
                    "FUNDAMENTALS_CACHE_TTL_SECS",
                    defaults.fundamentals.cache_ttl,
                )?,
                timeout: secs_or(&lookup, "FUNDAMENTALS_TIMEOUT_SECS", defaults.fundamentals.timeout)?,
                cold_call_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "FUNDAMENTALS_COLD_DELAY_MS",
                    defaults.fundamentals.cold_call_delay.as_millis() as u64,
                )?),
                max_retries: parse_or(
                    &lookup,
                    "FUNDAMENTALS_MAX_RETRIES",
                    defaults.fundamentals.max_retries,
                )?,
                retry_backoff: defaults.fundamentals.retry_backoff,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quote_concurrency == 0 {
            return Err(ConfigError::Zero("QUOTE_CONCURRENCY"));
        }
        if self.fundamentals_concurrency == 0 {
            return Err(ConfigError::Zero("FUNDAMENTALS_CONCURRENCY"));
        }
        if self.quote.timeout.is_zero() {
            return Err(ConfigError::Zero("QUOTE_TIMEOUT_SECS"));
        }
        if self.fundamentals.timeout.is_zero() {
            return Err(ConfigError::Zero("FUNDAMENTALS_TIMEOUT_SECS"));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}
