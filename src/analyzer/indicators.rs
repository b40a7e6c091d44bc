use crate::model::AnalysisError;

pub struct Indicators;

impl Indicators {
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Sample standard deviation (n − 1 denominator).
    pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
        if values.len() < 2 {
            return None;
        }
        let mean = Self::mean(values)?;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (values.len() - 1) as f64;
        Some(variance.sqrt())
    }

    /// Day-over-day percentage changes, one fewer than the input.
    pub fn pct_changes(values: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        values
            .windows(2)
            .map(|w| Self::pct_change(w[0], w[1]))
            .collect()
    }

    pub fn pct_change(from: f64, to: f64) -> Result<f64, AnalysisError> {
        if from == 0.0 {
            return Err(AnalysisError::InvalidPrice("percentage change from zero"));
        }
        Ok((to - from) / from * 100.0)
    }

    /// Trailing simple moving average aligned with the input; the first
    /// `window - 1` slots are `None`.
    pub fn moving_average(data: &[f64], window: usize) -> Vec<Option<f64>> {
        if window == 0 {
            return vec![None; data.len()];
        }
        let mut out = Vec::with_capacity(data.len());
        out.extend(std::iter::repeat_n(None, data.len().min(window - 1)));
        out.extend(
            data.windows(window)
                .map(|w| Some(w.iter().sum::<f64>() / window as f64)),
        );
        out
    }

    pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}
