// Core structs: PricePoint, Series, Statistics, TechnicalSummary, AlertResult
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One trading day of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily observations for one instrument, dates strictly ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<PricePoint>,
}

impl Series {
    /// Builds a series, rejecting out-of-order or duplicate dates.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, AnalysisError> {
        if let Some(pos) = points.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(AnalysisError::UnorderedSeries { index: pos + 1 });
        }
        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }
}

/// Lookback window requested from the market-data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::FiveYears => "5y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "5y" => Ok(Period::FiveYears),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesRequest {
    pub ticker: String,
    pub period: Period,
}

/// Outcome of a market-data request. An empty answer is `NoData`, not an error.
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Series),
    NoData,
    RetrievalFailure(FetchError),
}

impl FetchOutcome {
    /// Collapses anything but a non-empty series into `None`.
    pub fn into_series(self) -> Option<Series> {
        match self {
            FetchOutcome::Success(series) if !series.is_empty() => Some(series),
            _ => None,
        }
    }
}

/// Descriptive statistics over the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub ticker: String,
    pub current_price: f64,
    pub one_year_min: f64,
    pub one_year_max: f64,
    /// Percentage change from the first to the last close of the window.
    pub one_year_return: f64,
    pub five_year_min: Option<f64>,
    pub five_year_max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSummary {
    /// Annualized volatility, in percent.
    pub volatility: f64,
    pub mean_volume: f64,
    /// Percentage change from the last open to the last close.
    pub day_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAveragePoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Ok,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "CRITICAL"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Ok => write!(f, "OK"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertResult {
    pub severity: AlertSeverity,
    pub message: String,
    /// Distance of the current price above the annual minimum, in percent.
    pub distance_pct: f64,
}

impl AlertResult {
    /// True for the tiers that should reach the user.
    pub fn is_alert(&self) -> bool {
        matches!(self.severity, AlertSeverity::Critical | AlertSeverity::Warning)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no observations available for the requested window")]
    EmptySeries,
    #[error("reference price is zero: {0}")]
    InvalidPrice(&'static str),
    #[error("need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("dates out of order at index {index}")]
    UnorderedSeries { index: usize },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid series: {0}")]
    InvalidSeries(#[from] AnalysisError),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram API error: {0}")]
    ApiError(String),
    #[error("Telegram unreachable")]
    Unreachable,
}
