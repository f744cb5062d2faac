// crates/server/src/telegram/mod.rs
//! Telegram Bot API: the notifier and source fetcher used by conversion jobs,
//! plus the inbound update types the webhook receives.

pub mod client;
pub mod types;

pub use client::{TelegramClient, TelegramError};
pub use types::{Update, Message, Document};
