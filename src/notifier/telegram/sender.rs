// notifier/telegram/sender.rs

use crate::model::NotifyError;
use crate::notifier::telegram::TelegramNotifier;
use crate::report::InstrumentReport;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Sends a simple text message via Telegram.
pub async fn send_text(notifier: &TelegramNotifier, text: &str) -> Result<(), reqwest::Error> {
    let params = [
        ("chat_id", notifier.chat_id.to_string()),
        ("text", text.to_string()),
    ];
    let response = notifier
        .client
        .post(notifier.api_url("sendMessage"))
        .form(&params)
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ Telegram text error [{}]: {}", status, body);
    } else {
        info!("✅ Telegram text sent [{}]", status);
    }
    Ok(())
}

/// Sends an alert message for an instrument report.
pub async fn send_report(notifier: &TelegramNotifier, report: &InstrumentReport) -> Result<(), NotifyError> {
    let message = format!(
        "[{}] {}",
        report.alert.severity,
        report.render(&notifier.config.currency_symbol)
    );
    info!("📤 Sending Telegram message:\n{}", message);
    let response = match timeout(
        Duration::from_secs(10),
        notifier
            .client
            .post(notifier.api_url("sendMessage"))
            .form(&[("chat_id", notifier.chat_id.to_string()), ("text", message)])
            .send(),
    )
    .await
    {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!("❌ Telegram send() failed: {:?}", e);
            return Err(NotifyError::ApiError(format!("Send failed: {}", e)));
        }
        Err(_) => {
            warn!("⏳ Telegram send() timed out");
            return Err(NotifyError::Unreachable);
        }
    };
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ Telegram API responded [{}]: {}", status, body);
        return Err(NotifyError::ApiError(format!("{}: {}", status, body)));
    }
    info!("✅ Telegram response [{}]", status);
    Ok(())
}
