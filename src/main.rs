mod analyzer;
mod config;
mod fetcher;
mod model;
mod notifier;
mod report;
mod utils;

use config::{load_config, AppConfig, InstrumentConfig};
use fetcher::{MarketDataSource, YahooFetcher};
use futures::future::join_all;
use model::AlertSeverity;
use notifier::TelegramNotifier;
use report::{ReportError, ReportPipeline};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    let source: Arc<dyn MarketDataSource> = match YahooFetcher::new() {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to initialize market data source: {}", e);
            return;
        }
    };
    let pipeline = ReportPipeline::new(&config.analysis);
    let refresh_notify = Arc::new(Notify::new());

    let notifier = match config.telegram() {
        Some((token, chat_id)) => match TelegramNotifier::new(
            token.to_string(),
            chat_id,
            config.clone(),
            source.clone(),
            refresh_notify.clone(),
        ) {
            Ok(n) => Some(Arc::new(n)),
            Err(e) => {
                warn!("Telegram disabled: {}", e);
                None
            }
        },
        None => {
            info!("Telegram not configured, alerts are logged only.");
            None
        }
    };

    if let Some(notifier) = &notifier {
        if config.check_interval_seconds.is_some() {
            if let Err(e) = notifier.set_my_commands().await {
                warn!("setMyCommands failed: {:?}", e);
            }
            // Spawn listener for commands (e.g. /check, /refresh)
            TelegramNotifier::spawn_listener(notifier.clone());
        }
        info!("Sending startup message...");
        if let Err(e) = notifier.notify_text("🚀 DividendSniper started!").await {
            warn!("Startup notification failed: {:?}", e);
        }
    }

    // Main processing loop
    loop {
        info!("Instruments to process: {}", config.instruments().count());
        run_pass(&config, source.as_ref(), &pipeline, notifier.as_deref()).await;

        let Some(interval) = config.check_interval_seconds else {
            info!("Single pass finished.");
            break;
        };
        info!("Waiting for timer ({}s) or manual refresh...", interval);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {
                info!("Timer triggered.");
            }
            _ = refresh_notify.notified() => {
                info!("Manual refresh triggered.");
            }
        }
    }
}

/// Analyzes every catalog instrument concurrently and logs a tally.
async fn run_pass(
    config: &AppConfig,
    source: &dyn MarketDataSource,
    pipeline: &ReportPipeline,
    notifier: Option<&TelegramNotifier>,
) {
    let tasks: Vec<_> = config
        .instruments()
        .map(|inst| process_instrument(inst, config, source, pipeline, notifier))
        .collect();
    let outcomes = join_all(tasks).await;

    let count = |s: AlertSeverity| outcomes.iter().filter(|o| **o == Some(s)).count();
    info!(
        "Pass complete: {} critical, {} warning, {} ok, {} without data",
        count(AlertSeverity::Critical),
        count(AlertSeverity::Warning),
        count(AlertSeverity::Ok),
        outcomes.iter().filter(|o| o.is_none()).count()
    );
}

/// Runs the report pipeline for a single instrument, logging the results
/// and forwarding alerts to the notifier.
async fn process_instrument(
    instrument: &InstrumentConfig,
    config: &AppConfig,
    source: &dyn MarketDataSource,
    pipeline: &ReportPipeline,
    notifier: Option<&TelegramNotifier>,
) -> Option<AlertSeverity> {
    info!("Processing {} ({})", instrument.name, instrument.ticker);

    let report = match pipeline.run(source, instrument, config.period).await {
        Ok(report) => report,
        Err(e @ ReportError::NoData { .. }) => {
            warn!("{}", e);
            return None;
        }
        Err(e) => {
            warn!("Skipping {}: {}", instrument.ticker, e);
            return None;
        }
    };

    let s = &report.statistics;
    info!(
        "{}: price {:.2} | min {:.2} | max {:.2} | change {:.2}%",
        report.ticker, s.current_price, s.one_year_min, s.one_year_max, s.one_year_return
    );
    if let Some(t) = &report.technical {
        info!(
            "{}: volatility {:.2}% | mean volume {:.0} | day {:.2}%",
            report.ticker, t.volatility, t.mean_volume, t.day_return
        );
    }
    if report.alert.is_alert() {
        warn!("{}: [{}] {}", report.ticker, report.alert.severity, report.alert.message);
    } else {
        info!("{}: [{}] {}", report.ticker, report.alert.severity, report.alert.message);
    }

    if let Some(notifier) = notifier {
        notifier.check_and_notify(&report).await;
    }
    Some(report.alert.severity)
}
