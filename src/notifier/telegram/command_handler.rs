// notifier/telegram/command_handler.rs

use crate::config::{AppConfig, InstrumentConfig};
use crate::model::Period;
use crate::notifier::telegram::TelegramNotifier;
use crate::utils::format_uptime;
use std::fmt::Write;
use tracing::{info, warn};

#[derive(Debug, PartialEq)]
pub enum Command {
    Ping,
    Status,
    Help,
    Catalog,
    Check { ticker: String, period: Option<Period> },
    Refresh,
    Uptime,
    Unknown(String),
}

const HELP: &str = "📋 Available commands:\n\
    /ping — check connection\n\
    /status — monitor status\n\
    /help — command list\n\
    /catalog — monitored instruments\n\
    /check TICKER [1mo|3mo|6mo|1y] — analyze a ticker now\n\
    /refresh — run a check pass now\n\
    /uptime — service uptime";

/// Parses `/command[@bot] args...`.
pub fn parse_command(text: &str) -> Command {
    let mut parts = text.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let name = head.split('@').next().unwrap_or_default();
    match name {
        "/ping" => Command::Ping,
        "/status" => Command::Status,
        "/help" | "/start" => Command::Help,
        "/catalog" => Command::Catalog,
        "/refresh" => Command::Refresh,
        "/uptime" => Command::Uptime,
        "/check" => match parts.next() {
            Some(ticker) => Command::Check {
                ticker: ticker.to_uppercase(),
                period: parts.next().and_then(|p| p.parse().ok()),
            },
            None => Command::Unknown(text.to_string()),
        },
        _ => Command::Unknown(text.to_string()),
    }
}

pub fn render_catalog(config: &AppConfig) -> String {
    let mut msg = String::from("⚙️ Monitored instruments:\n");
    for sector in &config.catalog {
        let _ = writeln!(msg, "\n🔸 {}", sector.sector);
        for inst in &sector.instruments {
            let _ = writeln!(msg, "  • {} ({})", inst.name, inst.ticker);
        }
    }
    msg.trim_end().to_string()
}

/// Handles an incoming command and triggers the corresponding action.
pub async fn handle_command(command_text: &str, notifier: &TelegramNotifier) {
    info!("Handling command: {}", command_text);
    let reply = match parse_command(command_text) {
        Command::Ping => "✅ I am online!".to_string(),
        Command::Status => format!(
            "📊 Monitoring {} instruments over {}. {}",
            notifier.config.instruments().count(),
            notifier.config.period,
            match notifier.config.check_interval_seconds {
                Some(secs) => format!("Checking every {}s.", secs),
                None => "Single-pass mode.".to_string(),
            }
        ),
        Command::Help => HELP.to_string(),
        Command::Catalog => render_catalog(&notifier.config),
        Command::Refresh => {
            info!("/refresh command received, triggering refresh...");
            notifier.refresh_notify.notify_one();
            "🔄 Check pass triggered.".to_string()
        }
        Command::Uptime => format!("⏱ Uptime: {}", format_uptime(notifier.start_time.elapsed())),
        Command::Check { ticker, period } => check_ticker(notifier, &ticker, period).await,
        Command::Unknown(_) => "🤖 Unknown command. Type /help for a list of commands.".to_string(),
    };

    if let Err(e) = notifier.notify_text(&reply).await {
        warn!("Reply to '{}' failed: {:?}", command_text, e);
    }
}

async fn check_ticker(notifier: &TelegramNotifier, ticker: &str, period: Option<Period>) -> String {
    let instrument = notifier
        .config
        .find_instrument(ticker)
        .cloned()
        .unwrap_or_else(|| InstrumentConfig {
            ticker: ticker.to_string(),
            name: ticker.to_string(),
        });
    let period = period.unwrap_or(notifier.config.period);

    match notifier
        .pipeline
        .run(notifier.source.as_ref(), &instrument, period)
        .await
    {
        Ok(report) => report.render(&notifier.config.currency_symbol),
        Err(e) => {
            warn!("/check {} failed: {}", ticker, e);
            format!("❌ {}", e)
        }
    }
}
