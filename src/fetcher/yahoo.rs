// Yahoo Finance chart endpoint
use crate::fetcher::traits::MarketDataSource;
use crate::model::{FetchError, FetchOutcome, PricePoint, Series, SeriesRequest};
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooFetcher {
    client: Client,
    base_url: String,
}

impl YahooFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) DividendSniper/0.1")
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    fn build_url(&self, req: &SeriesRequest) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, req.ticker, req.period
        )
    }

    async fn fetch_body(&self, req: &SeriesRequest) -> Result<String, FetchError> {
        let url = self.build_url(req);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // 404 carries a chart error payload that parse_chart understands
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(FetchError::Api(format!("{} for {}", status, url)));
        }
        Ok(body)
    }
}

/// Decodes a chart payload into a series. Rows with any missing OHLCV field
/// are dropped; timestamps become exchange-local dates and a repeated date
/// keeps the most recent row.
pub fn parse_chart(body: &str) -> Result<Series, FetchError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        if error.code == "Not Found" {
            return Ok(Series::empty());
        }
        return Err(FetchError::Api(format!("{} - {}", error.code, error.description)));
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Series::empty());
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut points: Vec<PricePoint> = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let field = |column: &[Option<f64>]| column.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open[..]),
            field(&quote.high[..]),
            field(&quote.low[..]),
            field(&quote.close[..]),
            field(&quote.volume[..]),
        ) else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(ts + data.meta.gmtoffset, 0).map(|dt| dt.date_naive())
        else {
            continue;
        };

        let point = PricePoint {
            date,
            open,
            high,
            low,
            close,
            volume: volume.max(0.0).round() as u64,
        };
        match points.last_mut() {
            Some(prev) if prev.date == point.date => *prev = point,
            _ => points.push(point),
        }
    }

    Ok(Series::new(points)?)
}

#[async_trait::async_trait]
impl MarketDataSource for YahooFetcher {
    async fn fetch_series(&self, req: &SeriesRequest) -> FetchOutcome {
        let parsed = match self.fetch_body(req).await {
            Ok(body) => parse_chart(&body),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(series) if series.is_empty() => {
                warn!("No data found for {} ({})", req.ticker, req.period);
                FetchOutcome::NoData
            }
            Ok(series) => {
                info!("Fetched {} points for {} ({})", series.len(), req.ticker, req.period);
                FetchOutcome::Success(series)
            }
            Err(e) => {
                warn!("Failed to fetch {} ({}): {}", req.ticker, req.period, e);
                FetchOutcome::RetrievalFailure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "currency": "BRL", "symbol": "EGIE3.SA", "gmtoffset": -10800 },
                "timestamp": [1704718800, 1704805200, 1704891600, 1704895200],
                "indicators": { "quote": [{
                    "open":   [41.0, null, 41.5, 41.6],
                    "high":   [41.9, 42.0, 42.1, 42.2],
                    "low":    [40.8, 41.0, 41.2, 41.3],
                    "close":  [41.7, 41.8, 41.9, 42.0],
                    "volume": [1200300, 980000, 1500000, 1600000]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_chart_and_drops_incomplete_rows() {
        let series = parse_chart(SAMPLE).unwrap();
        // second row has no open; last two rows share a local date
        assert_eq!(series.len(), 2);
        let points = series.points();
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(points[0].volume, 1_200_300);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(points[1].close, 42.0);
    }

    #[test]
    fn not_found_is_empty_series() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn other_chart_errors_fail() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=1d is not supported"}}}"#;
        assert!(matches!(parse_chart(body), Err(FetchError::Api(_))));
    }

    #[test]
    fn result_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(parse_chart("<html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn url_uses_range_and_daily_interval() {
        let fetcher = YahooFetcher::new().unwrap();
        let req = SeriesRequest {
            ticker: "VALE3.SA".into(),
            period: Period::FiveYears,
        };
        assert_eq!(
            fetcher.build_url(&req),
            "https://query1.finance.yahoo.com/v8/finance/chart/VALE3.SA?range=5y&interval=1d"
        );
    }

    // Requires network access
    #[tokio::test]
    #[ignore]
    async fn fetches_live_series() {
        let fetcher = YahooFetcher::new().unwrap();
        let req = SeriesRequest {
            ticker: "ITUB4.SA".into(),
            period: Period::OneMonth,
        };
        assert!(matches!(fetcher.fetch_series(&req).await, FetchOutcome::Success(_)));
    }
}
