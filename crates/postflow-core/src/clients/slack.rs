//! Slack Web API client: approval requests, decision updates and summaries

use crate::config::SlackConfig;
use crate::error::{PostflowError, Result};
use crate::workflow::approval_types::{MessageRef, UserId, WorkflowId};
use crate::workflow::traits::ApprovalNotifier;
use async_trait::async_trait;
use postflow_types::Post;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};

pub const APPROVE_ACTION_ID: &str = "approve";
pub const REJECT_ACTION_ID: &str = "reject";

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

pub struct SlackClient {
    bot_token: String,
    channel_id: String,
    api_base: String,
    http_client: HttpClient,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Result<Self> {
        Ok(Self {
            bot_token: config.bot_token,
            channel_id: config.channel_id,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            http_client: super::http_client()?,
        })
    }

    /// Block Kit layout for an approval request. Both buttons carry the
    /// workflow id so the callback can be routed to its pending round.
    ///
    /// Platforms with their own copy get a section showing exactly the text
    /// their publisher will send; every other platform publishes the main text.
    pub fn approval_blocks(workflow_id: &WorkflowId, post: &Post, attempt: u32) -> Value {
        let mut blocks = vec![json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*Approval request, attempt {}*\n\n*{}*\n{}",
                    attempt + 1,
                    post.title,
                    post.text
                )
            }
        })];

        for variant in post.variants.iter().filter(|v| !v.description.trim().is_empty()) {
            blocks.push(json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*{}: {}*\n{}",
                        variant.platform,
                        variant.title,
                        post.text_for(variant.platform)
                    )
                }
            }));
        }

        if let Some(image_url) = &post.image_url {
            blocks.push(json!({
                "type": "image",
                "image_url": image_url,
                "alt_text": "Generated image"
            }));
        }

        blocks.push(json!({
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "text": {"type": "plain_text", "text": "Approve"},
                    "style": "primary",
                    "value": workflow_id.as_str(),
                    "action_id": APPROVE_ACTION_ID
                },
                {
                    "type": "button",
                    "text": {"type": "plain_text", "text": "Reject"},
                    "style": "danger",
                    "value": workflow_id.as_str(),
                    "action_id": REJECT_ACTION_ID
                }
            ]
        }));

        Value::Array(blocks)
    }

    /// Call a Web API method; Slack reports failures with `ok: false` on a 200
    async fn call(&self, api_method: &str, payload: &Value) -> Result<SlackResponse> {
        let url = format!("{}/{}", self.api_base, api_method);

        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::ServiceUnavailable(format!(
                "Slack {} returned {}: {}",
                api_method, status, error_text
            )));
        }

        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(PostflowError::Notify(format!(
                "Slack {} failed: {}",
                api_method,
                body.error.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl ApprovalNotifier for SlackClient {
    async fn request(&self, workflow_id: &WorkflowId, post: &Post, attempt: u32) -> Result<MessageRef> {
        let payload = json!({
            "channel": self.channel_id,
            "text": format!("Approval request for \"{}\"", post.title),
            "blocks": Self::approval_blocks(workflow_id, post, attempt)
        });

        let body = self.call("chat.postMessage", &payload).await?;
        let ts = body
            .ts
            .ok_or_else(|| PostflowError::Notify("Slack response has no message ts".to_string()))?;
        let channel = body.channel.unwrap_or_else(|| self.channel_id.clone());

        log::info!("Approval message posted for {} (channel {}, ts {})", workflow_id, channel, ts);
        Ok(MessageRef::new(channel, ts))
    }

    async fn update_message(&self, message: &MessageRef, summary: &str) -> Result<()> {
        let payload = json!({
            "channel": message.channel,
            "ts": message.ts,
            "text": summary,
            "blocks": [{
                "type": "section",
                "text": {"type": "mrkdwn", "text": summary}
            }]
        });

        self.call("chat.update", &payload).await?;
        Ok(())
    }

    async fn notify_user(&self, user: &UserId, channel: Option<&str>, text: &str) -> Result<()> {
        let payload = json!({
            "channel": channel.unwrap_or(&self.channel_id),
            "user": user.as_str(),
            "text": text
        });

        self.call("chat.postEphemeral", &payload).await?;
        Ok(())
    }

    async fn post_summary(&self, text: &str) -> Result<()> {
        let payload = json!({
            "channel": self.channel_id,
            "text": text
        });

        self.call("chat.postMessage", &payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postflow_types::{Platform, PlatformVariant};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(api_base: &str) -> SlackClient {
        SlackClient::new(SlackConfig {
            bot_token: "xoxb-test".to_string(),
            signing_secret: "secret".to_string(),
            channel_id: "C123".to_string(),
            api_base: api_base.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_approval_blocks_carry_workflow_id() {
        let id = WorkflowId::from_string("wf-42");
        let post = Post::new("Launch", "We are live").with_image("https://img.example/1.png");

        let blocks = SlackClient::approval_blocks(&id, &post, 1);
        let blocks = blocks.as_array().unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0]["text"]["text"].as_str().unwrap().contains("attempt 2"));
        assert_eq!(blocks[1]["type"], "image");

        let buttons = blocks[2]["elements"].as_array().unwrap();
        assert_eq!(buttons[0]["action_id"], APPROVE_ACTION_ID);
        assert_eq!(buttons[1]["action_id"], REJECT_ACTION_ID);
        assert!(buttons.iter().all(|b| b["value"] == "wf-42"));
    }

    #[test]
    fn test_approval_blocks_show_every_published_text() {
        let mut post = Post::new("Launch", "AI generated text");
        post.variants.push(PlatformVariant {
            platform: Platform::LinkedIn,
            title: "Launch on LinkedIn".to_string(),
            description: "Sheet copy for LinkedIn".to_string(),
            image_prompt: None,
        });
        post.variants.push(PlatformVariant {
            platform: Platform::Twitter,
            title: "Launch".to_string(),
            description: "  ".to_string(),
            image_prompt: None,
        });

        let blocks = SlackClient::approval_blocks(&WorkflowId::new(), &post, 0);
        let shown: Vec<&str> = blocks
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|b| b["text"]["text"].as_str())
            .collect();

        // Main text, plus one section for the only variant with its own copy
        assert_eq!(shown.len(), 2);
        for platform in [Platform::LinkedIn, Platform::Instagram, Platform::Facebook, Platform::Twitter] {
            let published = post.text_for(platform);
            assert!(
                shown.iter().any(|text| text.contains(published)),
                "{} text '{}' is not shown for approval",
                platform,
                published
            );
        }
        assert!(shown[1].starts_with("*LinkedIn: Launch on LinkedIn*"));
    }

    #[test]
    fn test_approval_blocks_without_image() {
        let blocks = SlackClient::approval_blocks(&WorkflowId::new(), &Post::new("t", "x"), 0);
        assert_eq!(blocks.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_request_returns_message_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(json!({"channel": "C123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channel": "C123",
                "ts": "1700000000.000100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = client(&server.uri())
            .request(&WorkflowId::new(), &Post::new("t", "x"), 0)
            .await
            .unwrap();
        assert_eq!(message, MessageRef::new("C123", "1700000000.000100"));
    }

    #[tokio::test]
    async fn test_ok_false_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .request(&WorkflowId::new(), &Post::new("t", "x"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PostflowError::Notify(msg) if msg.contains("channel_not_found")));
    }

    #[tokio::test]
    async fn test_update_and_ephemeral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .and(body_partial_json(json!({
                "channel": "C9",
                "ts": "1.2",
                "text": "✅ Approved by <@U1>",
                "blocks": [{"type": "section", "text": {"type": "mrkdwn", "text": "✅ Approved by <@U1>"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat.postEphemeral"))
            .and(body_partial_json(json!({"channel": "C123", "user": "U2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let slack = client(&server.uri());
        slack
            .update_message(&MessageRef::new("C9", "1.2"), "✅ Approved by <@U1>")
            .await
            .unwrap();
        slack.notify_user(&UserId::new("U2"), None, "expired").await.unwrap();
    }
}
