use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is set but LOKI_URL is missing")]
    MissingLokiUrl,

    #[error("invalid log filter {0:?}")]
    Filter(String),

    #[error("invalid Loki url: {0}")]
    LokiUrl(#[from] url::ParseError),

    #[cfg(feature = "loki")]
    #[error("loki layer: {0}")]
    Loki(#[from] tracing_loki::Error),

    #[error("subscriber already installed: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loki shipping is only switched on when `LOKI_ENABLED` is truthy.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let loki_url = match (loki_enabled, lookup("LOKI_URL")) {
            (true, Some(url)) => Some(url),
            (true, None) => return Err(LoggingError::MissingLokiUrl),
            (false, _) => None,
        };

        Ok(Self {
            loki_url,
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "folio-pulse".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            filter: lookup("RUST_LOG")
                .unwrap_or_else(|| "info,folio_pulse_backend=debug".to_string()),
        })
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.filter).map_err(|_| LoggingError::Filter(self.filter.clone()))
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;

    match config.loki_url.as_deref() {
        #[cfg(feature = "loki")]
        Some(loki_url) => {
            let url = url::Url::parse(loki_url)?;
            let (loki_layer, task) = tracing_loki::builder()
                .label("service", &config.service_name)?
                .label("environment", &config.environment)?
                .build_url(url)?;

            // Ships buffered events to Loki; must run on the tokio runtime.
            tokio::spawn(task);

            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(loki_layer)
                .try_init()?;

            tracing::info!(%loki_url, service = %config.service_name, "📊 Logging to console and Loki");
        }
        #[cfg(not(feature = "loki"))]
        Some(loki_url) => {
            url::Url::parse(loki_url)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;

            tracing::warn!(%loki_url, "Loki requested but the `loki` feature is disabled");
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;

            tracing::info!(environment = %config.environment, "📊 Logging to console");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_loki_off() {
        let config = LoggingConfig::from_lookup(|_| None).unwrap();

        assert!(config.loki_url.is_none());
        assert_eq!(config.service_name, "folio-pulse");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_loki_requires_url() {
        let missing = LoggingConfig::from_lookup(|key| match key {
            "LOKI_ENABLED" => Some("true".into()),
            _ => None,
        });
        assert!(matches!(missing, Err(LoggingError::MissingLokiUrl)));

        let config = LoggingConfig::from_lookup(|key| match key {
            "LOKI_ENABLED" => Some("1".into()),
            "LOKI_URL" => Some("http://localhost:3100".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.loki_url.as_deref(), Some("http://localhost:3100"));
    }

    #[test]
    fn test_url_ignored_when_disabled() {
        let config = LoggingConfig::from_lookup(|key| match key {
            "LOKI_URL" => Some("http://localhost:3100".into()),
            _ => None,
        })
        .unwrap();
        assert!(config.loki_url.is_none());
    }
}
