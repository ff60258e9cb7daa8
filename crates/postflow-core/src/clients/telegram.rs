//! Telegram client for out-of-band failure notifications

use crate::config::TelegramConfig;
use crate::error::{PostflowError, Result};
use crate::workflow::traits::FailureNotifier;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::json;

pub struct TelegramClient {
    bot_token: String,
    chat_id: String,
    base_url: String,
    http_client: HttpClient,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        Ok(Self {
            bot_token: config.bot_token,
            chat_id: config.chat_id,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: super::http_client()?,
        })
    }

    /// Escape special characters for Telegram HTML parse mode
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    fn format_failure(subject: &str, detail: &str) -> String {
        format!(
            "❌ <b>{}</b>\n\n{}\n\n⏰ <b>Time:</b> {}",
            Self::escape_html(subject),
            Self::escape_html(detail),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Send an HTML formatted message to the configured chat
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML"
        });

        let response = self.http_client
            .post(&url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::ServiceUnavailable(
                format!("Telegram API error: {}", error_text)
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl FailureNotifier for TelegramClient {
    async fn notify(&self, subject: &str, detail: &str) -> Result<()> {
        self.send_message(&Self::format_failure(subject, detail)).await?;
        log::info!("Telegram failure notification sent: {}", subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> TelegramClient {
        TelegramClient::new(TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "-100".to_string(),
            base_url: base_url.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            TelegramClient::escape_html("<b>Tom & Jerry</b>"),
            "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn test_notify_posts_html_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "-100", "parse_mode": "HTML"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .notify("Workflow timed out", "Campaign <Launch> timed out")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notify_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).notify("s", "d").await.unwrap_err();
        assert!(matches!(err, PostflowError::ServiceUnavailable(msg) if msg.contains("chat not found")));
    }
}
