pub mod sender;
pub mod listener;
pub mod command_handler;

use crate::config::AppConfig;
use crate::fetcher::MarketDataSource;
use crate::model::{AlertSeverity, NotifyError};
use crate::report::{InstrumentReport, ReportPipeline};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

/// Same-severity alerts for a ticker are repeated at most this often.
pub const REALERT_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

pub struct TelegramNotifier {
    pub bot_token: String,
    pub chat_id: i64,
    pub client: Client,
    pub offset: Arc<AtomicI64>,
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn MarketDataSource>,
    pub pipeline: ReportPipeline,
    pub start_time: Instant,
    pub refresh_notify: Arc<Notify>,
    last_alerts: Mutex<HashMap<String, (AlertSeverity, Instant)>>,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: String,
        chat_id: i64,
        config: Arc<AppConfig>,
        source: Arc<dyn MarketDataSource>,
        refresh_notify: Arc<Notify>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::ApiError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            bot_token,
            chat_id,
            client,
            offset: Arc::new(AtomicI64::new(0)),
            pipeline: ReportPipeline::new(&config.analysis),
            config,
            source,
            start_time: Instant::now(),
            refresh_notify,
            last_alerts: Mutex::new(HashMap::new()),
        })
    }

    pub fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    pub async fn notify_text(&self, text: &str) -> Result<(), reqwest::Error> {
        sender::send_text(self, text).await
    }

    pub async fn notify(&self, report: &InstrumentReport) -> Result<(), NotifyError> {
        sender::send_report(self, report).await
    }

    pub async fn listen_for_commands(&self) {
        listener::listen_for_commands(self).await;
    }

    pub async fn set_my_commands(&self) -> Result<(), reqwest::Error> {
        let commands = serde_json::json!({
            "commands": [
                { "command": "ping", "description": "Check connection" },
                { "command": "status", "description": "Show monitor status" },
                { "command": "help", "description": "Command list" },
                { "command": "catalog", "description": "Monitored instruments" },
                { "command": "check", "description": "Analyze a ticker now" },
                { "command": "refresh", "description": "Run a check pass now" },
                { "command": "uptime", "description": "Service uptime" }
            ]
        });
        self.client.post(self.api_url("setMyCommands")).json(&commands).send().await?;
        Ok(())
    }

    pub fn spawn_listener(notifier: Arc<TelegramNotifier>) {
        tokio::spawn(async move {
            tracing::info!("▶️ Starting Telegram listener...");
            notifier.listen_for_commands().await;
            tracing::info!("🛑 Telegram listener ended.");
        });
    }

    /// Sends the report when its alert tier warrants it and it was not
    /// already delivered recently. An OK report clears the ticker's history.
    pub async fn check_and_notify(&self, report: &InstrumentReport) {
        let ticker = &report.ticker;
        let severity = report.alert.severity;

        if !report.alert.is_alert() {
            if self.last_alerts.lock().await.remove(ticker).is_some() {
                info!("[alert] {} back to {}, history cleared", ticker, severity);
            }
            return;
        }

        let now = Instant::now();
        let due = alert_due(self.last_alerts.lock().await.get(ticker), severity, now);
        if !due {
            info!("[alert] {} {} already notified recently", ticker, severity);
            return;
        }

        info!("📤 [alert] Sending {} alert for {}", severity, ticker);
        match self.notify(report).await {
            Ok(_) => {
                self.last_alerts.lock().await.insert(ticker.clone(), (severity, now));
            }
            Err(e) => warn!("❌ [alert] Error sending notification for {}: {:?}", ticker, e),
        }
    }
}

/// True when no alert was sent yet, the tier changed, or the last one is stale.
pub fn alert_due(
    previous: Option<&(AlertSeverity, Instant)>,
    severity: AlertSeverity,
    now: Instant,
) -> bool {
    match previous {
        None => true,
        Some((prev, _)) if *prev != severity => true,
        Some((_, sent_at)) => now.saturating_duration_since(*sent_at) > REALERT_AFTER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_alert_is_due() {
        assert!(alert_due(None, AlertSeverity::Warning, Instant::now()));
    }

    #[test]
    fn repeated_alert_is_suppressed() {
        let sent = Instant::now();
        let prev = (AlertSeverity::Warning, sent);
        assert!(!alert_due(Some(&prev), AlertSeverity::Warning, sent + Duration::from_secs(60)));
        assert!(alert_due(
            Some(&prev),
            AlertSeverity::Warning,
            sent + REALERT_AFTER + Duration::from_secs(1)
        ));
    }

    #[test]
    fn tier_change_is_due() {
        let sent = Instant::now();
        let prev = (AlertSeverity::Warning, sent);
        assert!(alert_due(Some(&prev), AlertSeverity::Critical, sent));
    }
}
