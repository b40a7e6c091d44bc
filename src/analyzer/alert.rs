use crate::model::{AlertResult, AlertSeverity, AnalysisError, Statistics};

/// Distance above the annual low, in percent, at or below which a warning is raised.
pub const DEFAULT_WARNING_THRESHOLD_PCT: f64 = 5.0;

pub trait AlertEvaluator {
    fn evaluate(&self, stats: &Statistics) -> Result<AlertResult, AnalysisError>;
}

/// Flags prices at, below or near the trailing annual low.
#[derive(Debug, Clone)]
pub struct EvaluatorImpl {
    warning_threshold_pct: f64,
}

impl EvaluatorImpl {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_WARNING_THRESHOLD_PCT)
    }

    pub fn with_threshold(warning_threshold_pct: f64) -> Self {
        Self { warning_threshold_pct }
    }
}

impl Default for EvaluatorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertEvaluator for EvaluatorImpl {
    fn evaluate(&self, stats: &Statistics) -> Result<AlertResult, AnalysisError> {
        let min = stats.one_year_min;
        if min == 0.0 {
            return Err(AnalysisError::InvalidPrice("annual minimum"));
        }
        let distance_pct = (stats.current_price - min) / min * 100.0;

        let (severity, message) = if stats.current_price <= min {
            (
                AlertSeverity::Critical,
                "🚨 CRITICAL ALERT: new annual low reached!".to_string(),
            )
        } else if distance_pct <= self.warning_threshold_pct {
            (
                AlertSeverity::Warning,
                format!("⚠️ Price close to the annual minimum ({:.2}% above)", distance_pct),
            )
        } else {
            (
                AlertSeverity::Ok,
                format!("✅ Price is {:.2}% above the annual minimum", distance_pct),
            )
        };

        Ok(AlertResult {
            severity,
            message,
            distance_pct,
        })
    }
}
