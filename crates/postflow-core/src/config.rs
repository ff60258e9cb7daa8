//! Configuration management for the Postflow system
//!
//! Configuration is read from a file (JSON, TOML or YAML) and can be
//! overridden with `POSTFLOW__SECTION__KEY` environment variables.

use serde::{Deserialize, Serialize};
use crate::error::{PostflowError, Result};
use crate::workflow::approval_types::RejectPolicy;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "POSTFLOW";
const ENV_SEPARATOR: &str = "__";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostflowConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub approval: ApprovalConfig,

    pub slack: SlackConfig,
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub linkedin: Option<LinkedInConfig>,

    #[serde(default)]
    pub sheets: Option<SheetsConfig>,

    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

/// Timing and retry policy for approval rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_replay_window_secs")]
    pub replay_window_secs: u64,

    #[serde(default)]
    pub reject_policy: RejectPolicy,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            replay_window_secs: default_replay_window_secs(),
            reject_policy: RejectPolicy::default(),
        }
    }
}

impl ApprovalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn replay_window(&self) -> Duration {
        Duration::from_secs(self.replay_window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub bot_token: String,
    pub signing_secret: String,
    pub channel_id: String,

    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_true")]
    pub generate_images: bool,

    #[serde(alias = "api_base", default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    pub access_token: String,

    #[serde(alias = "person_urn")]
    pub author_urn: String,

    #[serde(default = "default_linkedin_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub access_token: String,
    pub spreadsheet_id: String,

    #[serde(default = "default_campaign_range")]
    pub campaign_range: String,

    #[serde(alias = "range", default = "default_audit_range")]
    pub audit_range: String,

    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,

    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
}

// Default functions
fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    60 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_replay_window_secs() -> u64 {
    60 * 5
}

fn default_true() -> bool {
    true
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_linkedin_base_url() -> String {
    "https://api.linkedin.com/v2".to_string()
}

fn default_campaign_range() -> String {
    "Campaigns!A2:N".to_string()
}

fn default_audit_range() -> String {
    "Log!A:D".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

impl PostflowConfig {
    /// Load configuration from a file, then apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PostflowError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: PostflowConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string, without environment overrides
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()?;

        let config: PostflowConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.slack.bot_token.is_empty() {
            return Err(PostflowError::Config("Slack bot token is required".to_string()));
        }

        if self.slack.signing_secret.is_empty() {
            return Err(PostflowError::Config("Slack signing secret is required".to_string()));
        }

        if self.slack.channel_id.is_empty() {
            return Err(PostflowError::Config("Slack channel id is required".to_string()));
        }

        if self.openai.api_key.is_empty() {
            return Err(PostflowError::Config("OpenAI API key is required".to_string()));
        }

        if self.approval.max_attempts == 0 {
            return Err(PostflowError::Config("approval.max_attempts must be at least 1".to_string()));
        }

        if self.approval.timeout_secs == 0 {
            return Err(PostflowError::Config("approval.timeout_secs must be positive".to_string()));
        }

        if let Some(linkedin) = &self.linkedin {
            if linkedin.access_token.is_empty() || linkedin.author_urn.is_empty() {
                return Err(PostflowError::Config(
                    "LinkedIn access token and author URN are required".to_string(),
                ));
            }
        }

        if let Some(sheets) = &self.sheets {
            if sheets.access_token.is_empty() || sheets.spreadsheet_id.is_empty() {
                return Err(PostflowError::Config(
                    "Sheets access token and spreadsheet id are required".to_string(),
                ));
            }
        }

        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.is_empty() {
                return Err(PostflowError::Config("Telegram bot token is required".to_string()));
            }
        }

        Ok(())
    }
}
