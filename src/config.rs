use crate::analyzer::{
    DEFAULT_MOVING_AVERAGE_WINDOW, DEFAULT_WARNING_THRESHOLD_PCT, TRADING_DAYS_PER_YEAR,
};
use crate::model::Period;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    pub ticker: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectorConfig {
    pub sector: String,
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_ma_window")]
    pub moving_average_window: usize,
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_pct: f64,
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            moving_average_window: default_ma_window(),
            warning_threshold_pct: default_warning_threshold(),
            trading_days_per_year: default_trading_days(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
    /// Seconds between check passes; absent means a single pass.
    pub check_interval_seconds: Option<u64>,
    #[serde(default = "default_period")]
    pub period: Period,
    #[serde(default = "default_currency")]
    pub currency_symbol: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub catalog: Vec<SectorConfig>,
}

impl AppConfig {
    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentConfig> {
        self.catalog.iter().flat_map(|s| s.instruments.iter())
    }

    /// Looks up a catalog entry by ticker, case-insensitively.
    pub fn find_instrument(&self, ticker: &str) -> Option<&InstrumentConfig> {
        self.instruments().find(|i| i.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Returns `(token, chat_id)` only when both are configured.
    pub fn telegram(&self) -> Option<(&str, i64)> {
        match (&self.telegram_bot_token, self.telegram_chat_id) {
            (Some(token), Some(chat_id)) if !token.trim().is_empty() => Some((token.as_str(), chat_id)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.moving_average_window == 0 {
            return Err(ConfigError::Invalid("moving_average_window must be at least 1".into()));
        }
        if !a.warning_threshold_pct.is_finite() || a.warning_threshold_pct < 0.0 {
            return Err(ConfigError::Invalid("warning_threshold_pct must be a non-negative number".into()));
        }
        if !a.trading_days_per_year.is_finite() || a.trading_days_per_year <= 0.0 {
            return Err(ConfigError::Invalid("trading_days_per_year must be positive".into()));
        }
        if self.period == Period::FiveYears {
            return Err(ConfigError::Invalid("period 5y is reserved for the long-horizon window".into()));
        }
        if self.instruments().next().is_none() {
            return Err(ConfigError::Invalid("catalog has no instruments".into()));
        }
        if let Some(bad) = self.instruments().find(|i| i.ticker.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("instrument '{}' has an empty ticker", bad.name)));
        }
        if self.check_interval_seconds == Some(0) {
            return Err(ConfigError::Invalid("check_interval_seconds must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_ma_window() -> usize {
    DEFAULT_MOVING_AVERAGE_WINDOW
}

fn default_warning_threshold() -> f64 {
    DEFAULT_WARNING_THRESHOLD_PCT
}

fn default_trading_days() -> f64 {
    TRADING_DAYS_PER_YEAR
}

fn default_period() -> Period {
    Period::OneYear
}

fn default_currency() -> String {
    "R$".to_string()
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MINIMAL: &str = r#"{
        "catalog": [
            { "sector": "Energy", "instruments": [
                { "ticker": "EGIE3.SA", "name": "Engie Brasil" },
                { "ticker": "TAEE4.SA", "name": "Taesa" }
            ]},
            { "sector": "Financial", "instruments": [
                { "ticker": "ITUB4.SA", "name": "Itaú Unibanco" }
            ]}
        ]
    }"#;

    #[test]
    fn defaults_apply() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.period, Period::OneYear);
        assert_eq!(cfg.currency_symbol, "R$");
        assert_eq!(cfg.analysis.moving_average_window, 20);
        assert_eq!(cfg.analysis.warning_threshold_pct, 5.0);
        assert_eq!(cfg.analysis.trading_days_per_year, 252.0);
        assert_eq!(cfg.check_interval_seconds, None);
        assert!(cfg.telegram().is_none());
        assert_eq!(cfg.instruments().count(), 3);
    }

    #[test]
    fn finds_instrument_ignoring_case() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.find_instrument("itub4.sa").map(|i| i.name.as_str()), Some("Itaú Unibanco"));
        assert!(cfg.find_instrument("PETR4.SA").is_none());
    }

    #[test]
    fn overrides_and_telegram() {
        let cfg = parse_config(
            r#"{
                "telegram_bot_token": "123:abc",
                "telegram_chat_id": 42,
                "check_interval_seconds": 3600,
                "period": "6mo",
                "analysis": { "warning_threshold_pct": 7.5 },
                "catalog": [{ "sector": "Other", "instruments": [{ "ticker": "VALE3.SA", "name": "Vale" }] }]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.period, Period::SixMonths);
        assert_eq!(cfg.analysis.warning_threshold_pct, 7.5);
        assert_eq!(cfg.analysis.moving_average_window, 20);
        assert_eq!(cfg.telegram(), Some(("123:abc", 42)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = parse_config(
            r#"{ "analysis": { "moving_average_window": 0 },
                 "catalog": [{ "sector": "S", "instruments": [{ "ticker": "A", "name": "A" }] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            parse_config(r#"{ "catalog": [{ "sector": "S", "instruments": [] }] }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unknown_period() {
        let err = parse_config(
            r#"{ "period": "2y", "catalog": [{ "sector": "S", "instruments": [{ "ticker": "A", "name": "A" }] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(load_config("does/not/exist.json"), Err(ConfigError::Io(_))));
    }
}
