use crate::analyzer::indicators::Indicators;
use crate::model::{AnalysisError, MovingAveragePoint, Series, Statistics, TechnicalSummary};
use tracing::debug;

/// Trading sessions per year used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Window, in trading days, of the moving-average overlay.
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 20;

/// Trait defining the interface for a price series analyzer.
pub trait SeriesAnalyzer {
    fn compute_statistics(
        &self,
        ticker: &str,
        one_year: &Series,
        five_year: Option<&Series>,
    ) -> Result<Statistics, AnalysisError>;
    fn compute_moving_average(&self, series: &Series, window: usize) -> Vec<MovingAveragePoint>;
    fn compute_technical_summary(&self, series: &Series) -> Result<TechnicalSummary, AnalysisError>;
}

/// Implementation of the series analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerImpl {
    trading_days_per_year: f64,
}

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self::with_trading_days(TRADING_DAYS_PER_YEAR)
    }

    pub fn with_trading_days(trading_days_per_year: f64) -> Self {
        Self { trading_days_per_year }
    }
}

impl Default for AnalyzerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesAnalyzer for AnalyzerImpl {
    /// Current price, min/max and return over the window, plus the
    /// long-horizon extrema when that series is available.
    fn compute_statistics(
        &self,
        ticker: &str,
        one_year: &Series,
        five_year: Option<&Series>,
    ) -> Result<Statistics, AnalysisError> {
        let (first, last) = match (one_year.first(), one_year.last()) {
            (Some(first), Some(last)) => (first.close, last.close),
            _ => return Err(AnalysisError::EmptySeries),
        };
        if first == 0.0 {
            return Err(AnalysisError::InvalidPrice("first close of the window"));
        }
        let (min, max) = Indicators::min_max(one_year.closes()).ok_or(AnalysisError::EmptySeries)?;

        let long = five_year.and_then(|s| Indicators::min_max(s.closes()));
        if long.is_none() {
            debug!("{}: no long-horizon data, 5y extrema left empty", ticker);
        }

        Ok(Statistics {
            ticker: ticker.to_string(),
            current_price: last,
            one_year_min: min,
            one_year_max: max,
            one_year_return: (last - first) / first * 100.0,
            five_year_min: long.map(|(lo, _)| lo),
            five_year_max: long.map(|(_, hi)| hi),
        })
    }

    fn compute_moving_average(&self, series: &Series, window: usize) -> Vec<MovingAveragePoint> {
        let closes: Vec<f64> = series.closes().collect();
        series
            .points()
            .iter()
            .zip(Indicators::moving_average(&closes, window))
            .map(|(p, value)| MovingAveragePoint { date: p.date, value })
            .collect()
    }

    /// Annualized volatility of daily close changes, mean volume and the
    /// open-to-close return of the last session.
    fn compute_technical_summary(&self, series: &Series) -> Result<TechnicalSummary, AnalysisError> {
        let insufficient = AnalysisError::InsufficientData {
            required: 2,
            actual: series.len(),
        };
        let last = match series.last() {
            Some(last) if series.len() >= 2 => last,
            _ => return Err(insufficient),
        };

        let closes: Vec<f64> = series.closes().collect();
        let changes = Indicators::pct_changes(&closes)?;
        let daily_sd = Indicators::sample_std_dev(&changes).unwrap_or(0.0);

        let volumes: Vec<f64> = series.points().iter().map(|p| p.volume as f64).collect();
        let mean_volume = Indicators::mean(&volumes).ok_or(insufficient)?;

        if last.open == 0.0 {
            return Err(AnalysisError::InvalidPrice("last open"));
        }

        Ok(TechnicalSummary {
            volatility: daily_sd * self.trading_days_per_year.sqrt(),
            mean_volume,
            day_return: (last.close - last.open) / last.open * 100.0,
        })
    }
}
