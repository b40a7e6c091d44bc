// Analyzer module: statistics, moving average, technical summary and alert tiers.

pub mod series_analysis;
pub mod indicators;
pub mod alert;

pub use alert::{AlertEvaluator, EvaluatorImpl, DEFAULT_WARNING_THRESHOLD_PCT};
pub use series_analysis::{
    AnalyzerImpl, SeriesAnalyzer, DEFAULT_MOVING_AVERAGE_WINDOW, TRADING_DAYS_PER_YEAR,
};
