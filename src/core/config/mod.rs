use anyhow::{anyhow, Context, Result};
use log::warn;

use crate::reports::export::ReportLocale;
use crate::reports::forecast::ForecastWeights;

const DEV_JWT_SECRET: &str = "crmserver-development-secret";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub reports: ReportsConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ReportsConfig {
    pub default_locale: ReportLocale,
    pub forecast_weights: ForecastWeights,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process
    /// environment, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let port = match get("SERVER_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("Invalid SERVER_PORT: {v}"))?,
            None => 8080,
        };

        let pool_size = match get("DB_POOL_SIZE") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("Invalid DB_POOL_SIZE: {v}"))?,
            None => 10,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default development secret - DO NOT USE IN PRODUCTION");
            DEV_JWT_SECRET.to_string()
        });

        let default_locale = match get("REPORT_LOCALE") {
            Some(v) => v
                .parse::<ReportLocale>()
                .map_err(|e| anyhow!("Invalid REPORT_LOCALE: {e}"))?,
            None => ReportLocale::default(),
        };

        let defaults = ForecastWeights::default();
        let weight = |key: &str, default: f64| -> Result<f64> {
            match get(key) {
                Some(v) => {
                    let parsed = v
                        .parse::<f64>()
                        .with_context(|| format!("Invalid {key}: {v}"))?;
                    if !(0.0..=1.0).contains(&parsed) {
                        return Err(anyhow!("{key} must be between 0 and 1, got {parsed}"));
                    }
                    Ok(parsed)
                }
                None => Ok(default),
            }
        };

        let forecast_weights = ForecastWeights {
            first_contact: weight("FORECAST_WEIGHT_FIRST_CONTACT", defaults.first_contact)?,
            qualification: weight("FORECAST_WEIGHT_QUALIFICATION", defaults.qualification)?,
            proposal: weight("FORECAST_WEIGHT_PROPOSAL", defaults.proposal)?,
            negotiation: weight("FORECAST_WEIGHT_NEGOTIATION", defaults.negotiation)?,
        };

        Ok(Self {
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
            database: DatabaseConfig { url, pool_size },
            auth: AuthConfig { jwt_secret },
            reports: ReportsConfig {
                default_locale,
                forecast_weights,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config =
            AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/crm")]))
                .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.reports.default_locale, ReportLocale::En);
        assert_eq!(config.reports.forecast_weights, ForecastWeights::default());
    }

    #[test]
    fn test_database_url_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("SERVER_PORT", "9090"),
            ("REPORT_LOCALE", "pt"),
            ("FORECAST_WEIGHT_PROPOSAL", "0.6"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.reports.default_locale, ReportLocale::Pt);
        assert!((config.reports.forecast_weights.proposal - 0.6).abs() < f64::EPSILON);
        assert!((config.reports.forecast_weights.negotiation - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("FORECAST_WEIGHT_NEGOTIATION", "1.5"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("FORECAST_WEIGHT_NEGOTIATION"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: "super-secret".to_string(),
        };
        assert!(!format!("{auth:?}").contains("super-secret"));
    }
}
