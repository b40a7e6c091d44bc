// Notifier module: alert delivery and chat commands.

pub mod telegram;

pub use telegram::TelegramNotifier;
