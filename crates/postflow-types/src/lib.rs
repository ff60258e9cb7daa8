//! Shared types for the Postflow publishing workflow

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

/// Social platforms a post can be published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LinkedIn,
    Instagram,
    Facebook,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform specific copy of a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformVariant {
    pub platform: Platform,
    pub title: String,
    pub description: String,
    pub image_prompt: Option<String>,
}

/// A campaign as loaded from the campaign sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub variants: Vec<PlatformVariant>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Campaign {
    /// Create a campaign without platform variants
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            variants: Vec::new(),
            date: None,
        }
    }

    pub fn variant(&self, platform: Platform) -> Option<&PlatformVariant> {
        self.variants.iter().find(|v| v.platform == platform)
    }
}

/// Generated post awaiting approval. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub text: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub variants: Vec<PlatformVariant>,
}

impl Post {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            image_url: None,
            variants: Vec::new(),
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Text to publish on a given platform, falling back to the main text
    pub fn text_for(&self, platform: Platform) -> &str {
        self.variants
            .iter()
            .find(|v| v.platform == platform && !v.description.trim().is_empty())
            .map(|v| v.description.as_str())
            .unwrap_or(&self.text)
    }
}

/// Result of publishing to a single platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub platform: Platform,
    pub success: bool,
    pub error: Option<String>,
}

impl PublishStatus {
    pub fn succeeded(platform: Platform) -> Self {
        Self { platform, success: true, error: None }
    }

    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self { platform, success: false, error: Some(error.into()) }
    }

    /// Short form used in summaries and audit rows, e.g. `LinkedIn:ok`
    pub fn short(&self) -> String {
        format!("{}:{}", self.platform, if self.success { "ok" } else { "failed" })
    }
}

/// Severity of a run log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Single line of the per-run log returned to the workflow caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub time: DateTime<Utc>,
}

/// Ordered log of one workflow run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog(Vec<LogEntry>);

impl RunLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.0.push(LogEntry {
            message: message.into(),
            level,
            time: Utc::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_display_and_serde_names() {
        assert_eq!(Platform::LinkedIn.to_string(), "LinkedIn");
        assert_eq!(serde_json::to_value(Platform::Twitter).unwrap(), "Twitter");
    }

    #[test]
    fn test_post_text_for_falls_back_to_main_text() {
        let mut post = Post::new("Launch", "Main text");
        post.variants.push(PlatformVariant {
            platform: Platform::Instagram,
            title: "IG".to_string(),
            description: "Instagram text".to_string(),
            image_prompt: None,
        });

        assert_eq!(post.text_for(Platform::Instagram), "Instagram text");
        assert_eq!(post.text_for(Platform::LinkedIn), "Main text");
    }

    #[test]
    fn test_run_log_serializes_with_type_field() {
        let mut log = RunLog::new();
        log.warning("Rejected (attempt 1)");

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["type"], "warning");
        assert_eq!(json[0]["message"], "Rejected (attempt 1)");
        assert!(json[0]["time"].is_string());
    }

    #[test]
    fn test_publish_status_short_form() {
        assert_eq!(PublishStatus::succeeded(Platform::Facebook).short(), "Facebook:ok");
        assert_eq!(PublishStatus::failed(Platform::Twitter, "boom").short(), "Twitter:failed");
    }
}
