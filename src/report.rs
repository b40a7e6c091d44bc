use crate::analyzer::{AlertEvaluator, AnalyzerImpl, EvaluatorImpl, SeriesAnalyzer};
use crate::config::{AnalysisConfig, InstrumentConfig};
use crate::fetcher::MarketDataSource;
use crate::model::{
    AlertResult, AnalysisError, FetchError, FetchOutcome, MovingAveragePoint, Period,
    SeriesRequest, Statistics, TechnicalSummary,
};
use crate::utils::format_thousands;
use std::fmt::Write;
use thiserror::Error;
use tracing::{debug, warn};

/// Everything the presentation side needs for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub ticker: String,
    pub name: String,
    pub period: Period,
    pub statistics: Statistics,
    /// Absent when the window holds fewer than two sessions.
    pub technical: Option<TechnicalSummary>,
    pub moving_average: Vec<MovingAveragePoint>,
    pub moving_average_window: usize,
    pub alert: AlertResult,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no data for {ticker} ({period})")]
    NoData { ticker: String, period: Period },
    #[error("retrieval failed for {ticker}: {source}")]
    Retrieval { ticker: String, source: FetchError },
    #[error("analysis failed for {ticker}: {source}")]
    Analysis { ticker: String, source: AnalysisError },
}

/// Fetch → analyze → evaluate for a single instrument.
#[derive(Debug, Clone)]
pub struct ReportPipeline {
    analyzer: AnalyzerImpl,
    evaluator: EvaluatorImpl,
    moving_average_window: usize,
}

impl ReportPipeline {
    pub fn new(cfg: &AnalysisConfig) -> Self {
        Self {
            analyzer: AnalyzerImpl::with_trading_days(cfg.trading_days_per_year),
            evaluator: EvaluatorImpl::with_threshold(cfg.warning_threshold_pct),
            moving_average_window: cfg.moving_average_window,
        }
    }

    pub async fn run(
        &self,
        source: &dyn MarketDataSource,
        instrument: &InstrumentConfig,
        period: Period,
    ) -> Result<InstrumentReport, ReportError> {
        let ticker = instrument.ticker.clone();
        let window_req = SeriesRequest { ticker: ticker.clone(), period };
        let long_req = SeriesRequest { ticker: ticker.clone(), period: Period::FiveYears };

        let (window, long) =
            futures::join!(source.fetch_series(&window_req), source.fetch_series(&long_req));

        let series = match window {
            FetchOutcome::Success(series) if !series.is_empty() => series,
            FetchOutcome::Success(_) | FetchOutcome::NoData => {
                return Err(ReportError::NoData { ticker, period });
            }
            FetchOutcome::RetrievalFailure(e) => {
                return Err(ReportError::Retrieval { ticker, source: e });
            }
        };
        let long = long.into_series();
        if long.is_none() {
            debug!("{}: long-horizon series unavailable", ticker);
        }

        let analysis_err = |source: AnalysisError| ReportError::Analysis { ticker: ticker.clone(), source };
        let statistics = self
            .analyzer
            .compute_statistics(&ticker, &series, long.as_ref())
            .map_err(analysis_err)?;
        let alert = self.evaluator.evaluate(&statistics).map_err(analysis_err)?;

        let technical = match self.analyzer.compute_technical_summary(&series) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("{}: technical summary skipped: {}", ticker, e);
                None
            }
        };
        let moving_average = self
            .analyzer
            .compute_moving_average(&series, self.moving_average_window);

        Ok(InstrumentReport {
            ticker,
            name: instrument.name.clone(),
            period,
            statistics,
            technical,
            moving_average,
            moving_average_window: self.moving_average_window,
            alert,
        })
    }
}

impl InstrumentReport {
    /// Latest defined moving-average value.
    pub fn last_moving_average(&self) -> Option<f64> {
        self.moving_average.last().and_then(|p| p.value)
    }

    /// Plain-text summary for chat messages and logs.
    pub fn render(&self, currency: &str) -> String {
        let s = &self.statistics;
        let mut out = String::new();
        let _ = writeln!(out, "📈 {} ({}) [{}]", self.name, self.ticker, self.period);
        let _ = writeln!(out, "{}", self.alert.message);
        let _ = writeln!(out);
        let _ = writeln!(out, "💵 Current price: {} {:.2}", currency, s.current_price);
        let _ = writeln!(out, "📉 Annual minimum: {} {:.2}", currency, s.one_year_min);
        let _ = writeln!(out, "📈 Annual maximum: {} {:.2}", currency, s.one_year_max);
        let _ = writeln!(out, "📊 Annual change: {:.2}%", s.one_year_return);
        if let (Some(min), Some(max)) = (s.five_year_min, s.five_year_max) {
            let _ = writeln!(out, "5-year minimum: {} {:.2}", currency, min);
            let _ = writeln!(out, "5-year maximum: {} {:.2}", currency, max);
        }
        if let Some(ma) = self.last_moving_average() {
            let _ = writeln!(out, "MA{}: {} {:.2}", self.moving_average_window, currency, ma);
        }
        if let Some(t) = &self.technical {
            let _ = writeln!(out, "Volatility: {:.2}%", t.volatility);
            let _ = writeln!(out, "Average volume: {}", format_thousands(t.mean_volume));
            let _ = writeln!(out, "Day change: {:.2}%", t.day_return);
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::tests::{point, series_from_closes};
    use crate::model::{AlertSeverity, Series};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    pub(crate) enum Reply {
        Data(Series),
        Empty,
        Fail,
    }

    /// In-memory source keyed by (ticker, period); unknown keys answer `NoData`.
    #[derive(Default)]
    pub(crate) struct MockSource {
        replies: HashMap<(String, Period), Reply>,
        pub(crate) calls: Mutex<Vec<(String, Period)>>,
    }

    impl MockSource {
        pub(crate) fn with(mut self, ticker: &str, period: Period, reply: Reply) -> Self {
            self.replies.insert((ticker.to_string(), period), reply);
            self
        }
    }

    #[async_trait::async_trait]
    impl MarketDataSource for MockSource {
        async fn fetch_series(&self, req: &SeriesRequest) -> FetchOutcome {
            self.calls.lock().unwrap().push((req.ticker.clone(), req.period));
            match self.replies.get(&(req.ticker.clone(), req.period)) {
                Some(Reply::Data(series)) => FetchOutcome::Success(series.clone()),
                Some(Reply::Fail) => {
                    FetchOutcome::RetrievalFailure(FetchError::Api("503 Service Unavailable".into()))
                }
                Some(Reply::Empty) | None => FetchOutcome::NoData,
            }
        }
    }

    pub(crate) fn instrument(ticker: &str) -> InstrumentConfig {
        InstrumentConfig {
            ticker: ticker.to_string(),
            name: "Test Co".to_string(),
        }
    }

    fn pipeline() -> ReportPipeline {
        ReportPipeline::new(&AnalysisConfig::default())
    }

    #[tokio::test]
    async fn full_report() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let source = MockSource::default()
            .with("A", Period::OneYear, Reply::Data(series_from_closes(&closes)))
            .with("A", Period::FiveYears, Reply::Data(series_from_closes(&[150.0, 60.0, 71.0])));

        let report = pipeline().run(&source, &instrument("A"), Period::OneYear).await.unwrap();

        assert_eq!(report.statistics.current_price, 71.0);
        assert_eq!(report.statistics.five_year_min, Some(60.0));
        assert_eq!(report.statistics.five_year_max, Some(150.0));
        assert_eq!(report.alert.severity, AlertSeverity::Critical);
        assert_eq!(report.moving_average.len(), 30);
        assert_eq!(report.moving_average_window, 20);
        assert!(report.render("R$").contains("MA20: R$ 80.50"));
        assert!(report.technical.is_some());

        let calls = source.calls.lock().unwrap();
        assert!(calls.contains(&("A".to_string(), Period::FiveYears)));
    }

    #[tokio::test]
    async fn missing_long_horizon_is_not_an_error() {
        let source = MockSource::default()
            .with("A", Period::SixMonths, Reply::Data(series_from_closes(&[10.0, 12.0])))
            .with("A", Period::FiveYears, Reply::Fail);

        let report = pipeline().run(&source, &instrument("A"), Period::SixMonths).await.unwrap();
        assert_eq!(report.statistics.five_year_min, None);
        assert_eq!(report.period, Period::SixMonths);
        assert_eq!(report.alert.severity, AlertSeverity::Ok);
    }

    #[tokio::test]
    async fn empty_window_is_no_data() {
        let source = MockSource::default().with("A", Period::OneYear, Reply::Empty);
        let err = pipeline().run(&source, &instrument("A"), Period::OneYear).await.unwrap_err();
        assert!(matches!(err, ReportError::NoData { period: Period::OneYear, .. }));
    }

    #[tokio::test]
    async fn failed_window_is_retrieval_error() {
        let source = MockSource::default().with("A", Period::OneYear, Reply::Fail);
        let err = pipeline().run(&source, &instrument("A"), Period::OneYear).await.unwrap_err();
        assert!(matches!(err, ReportError::Retrieval { .. }));
    }

    #[tokio::test]
    async fn zero_first_close_surfaces_invalid_price() {
        let source = MockSource::default()
            .with("A", Period::OneYear, Reply::Data(series_from_closes(&[0.0, 5.0])));
        let err = pipeline().run(&source, &instrument("A"), Period::OneYear).await.unwrap_err();
        assert!(matches!(
            err,
            ReportError::Analysis { source: AnalysisError::InvalidPrice(_), .. }
        ));
    }

    #[tokio::test]
    async fn single_session_skips_technical_summary() {
        let source = MockSource::default()
            .with("A", Period::OneMonth, Reply::Data(series_from_closes(&[10.0])));
        let report = pipeline().run(&source, &instrument("A"), Period::OneMonth).await.unwrap();
        assert!(report.technical.is_none());
        assert_eq!(report.last_moving_average(), None);
    }

    #[tokio::test]
    async fn render_includes_metrics() {
        let series = Series::new(vec![
            point(0, 20.0, 20.0, 1_000_000),
            point(1, 20.0, 21.0, 3_000_000),
        ])
        .unwrap();
        let source = MockSource::default()
            .with("EGIE3.SA", Period::OneYear, Reply::Data(series))
            .with("EGIE3.SA", Period::FiveYears, Reply::Data(series_from_closes(&[15.0, 30.0])));

        let report = pipeline()
            .run(&source, &instrument("EGIE3.SA"), Period::OneYear)
            .await
            .unwrap();
        let text = report.render("R$");

        assert!(text.starts_with("📈 Test Co (EGIE3.SA) [1y]"));
        assert!(text.contains("Current price: R$ 21.00"));
        assert!(text.contains("Annual minimum: R$ 20.00"));
        assert!(text.contains("Annual change: 5.00%"));
        assert!(text.contains("5-year minimum: R$ 15.00"));
        assert!(text.contains("Average volume: 2,000,000"));
        assert!(text.contains("Day change: 5.00%"));
        assert!(!text.contains("MA20"));
    }
}
