//! Staff notifications for ticket events.
//!
//! Delivery is best-effort: callers log a [`DeliveryError`] and move on.

use crate::types::{Ticket, TicketUpdate};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Telegram Bot API endpoint.
const TELEGRAM_API: &str = "https://api.telegram.org";

/// Upper bound on a single delivery attempt.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while delivering a notification.
#[derive(Debug)]
pub enum DeliveryError {
    /// The request never got an answer.
    Transport(String),
    /// The channel answered with a failure status.
    Api { status: u16, message: String },
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Transport(e) => write!(f, "notification transport error: {}", e),
            DeliveryError::Api { status, message } => {
                write!(f, "notification rejected ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

impl From<reqwest::Error> for DeliveryError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// A channel that can announce ticket events to staff.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one pre-rendered message. One attempt, no retries.
    async fn notify(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Credentials for the Telegram bot channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    /// Both values must be present and non-blank.
    pub fn from_parts(bot_token: Option<String>, chat_id: Option<String>) -> Option<Self> {
        let bot_token = bot_token.filter(|t| !t.trim().is_empty())?;
        let chat_id = chat_id.filter(|c| !c.trim().is_empty())?;
        Some(Self { bot_token, chat_id })
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts messages to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API, self.config.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id: &self.config.chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(DeliveryError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Fallback channel that writes messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), DeliveryError> {
        log::info!("Notification (no channel configured):\n{}", text);
        Ok(())
    }
}

/// The channel for the given credentials, falling back to [`LogNotifier`].
pub fn notifier_for(telegram: Option<TelegramConfig>) -> Arc<dyn Notifier> {
    let Some(config) = telegram else {
        log::warn!(
            "Telegram credentials not set (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID); notifications go to the log"
        );
        return Arc::new(LogNotifier);
    };

    match TelegramNotifier::new(config) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            log::error!("Failed to set up Telegram notifications: {}", e);
            Arc::new(LogNotifier)
        }
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Message announcing a newly filed ticket.
pub fn render_new_ticket(ticket: &Ticket) -> String {
    format!(
        "🆕 <b>NEW IT SUPPORT TICKET</b>\n\n\
         🎫 <b>Ticket ID:</b> <code>{}</code>\n\
         👤 <b>Name:</b> {}\n\
         🏢 <b>Department:</b> {}\n\
         🚨 <b>Urgency:</b> {}\n\
         📝 <b>Issue:</b>\n{}\n\n\
         ⏰ <b>Submitted:</b> {}",
        escape_html(&ticket.id),
        escape_html(&ticket.name),
        escape_html(&ticket.department),
        escape_html(&ticket.urgency),
        escape_html(&ticket.issue),
        ticket.created_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Message describing an applied update.
pub fn render_update(ticket: &Ticket, update: &TicketUpdate) -> String {
    let mut text = format!(
        "🔄 <b>TICKET UPDATED</b>\n\n\
         🎫 <b>Ticket ID:</b> <code>{}</code>\n\
         📌 <b>Status:</b> {}",
        escape_html(&ticket.id),
        escape_html(ticket.effective_status()),
    );

    if update.assign_to.is_some() {
        let assignee = ticket.assign_to.as_deref().unwrap_or("unassigned");
        text.push_str(&format!("\n👷 <b>Assigned to:</b> {}", escape_html(assignee)));
    }

    let added = update.notes.len();
    if added > 0 {
        let start = ticket.notes.len().saturating_sub(added);
        for note in &ticket.notes[start..] {
            text.push_str(&format!(
                "\n🗒 <b>{}:</b> {}",
                escape_html(&note.by),
                escape_html(&note.text)
            ));
        }
    }

    text.push_str(&format!(
        "\n\n⏰ <b>Updated:</b> {}",
        ticket.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    text
}
