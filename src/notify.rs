use std::time::Duration;

use serde_json::json;
use tracing::warn;

/// Best-effort Telegram notifications. Unconfigured channels are a silent
/// no-op and delivery failures never interrupt the run.
pub struct Notifier {
    channel: Option<Channel>,
}

struct Channel {
    client: reqwest::blocking::Client,
    url: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        let channel = match (bot_token, chat_id) {
            (Some(token), Some(chat_id)) => reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .ok()
                .map(|client| Channel {
                    client,
                    url: format!("https://api.telegram.org/bot{token}/sendMessage"),
                    chat_id,
                }),
            _ => None,
        };

        Self { channel }
    }

    pub fn send(&self, text: &str) {
        let Some(channel) = &self.channel else {
            return;
        };

        let payload = json!({
            "chat_id": channel.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        if let Err(err) = channel.client.post(&channel.url).json(&payload).send() {
            warn!(%err, "failed to send Telegram notification");
        }
    }
}
