//! Client modules for external services

pub mod linkedin;
pub mod openai;
pub mod sheets;
pub mod slack;
pub mod social;
pub mod telegram;

pub use linkedin::LinkedInPublisher;
pub use openai::OpenAIClient;
pub use sheets::{SheetsClient, StaticCampaignSource};
pub use slack::SlackClient;
pub use social::LogOnlyPublisher;
pub use telegram::TelegramClient;

/// Build the shared HTTP client used by every service client
pub(crate) fn http_client() -> crate::error::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}
