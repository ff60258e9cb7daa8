//! OpenAI client for post text and promotional images

use crate::config::OpenAIConfig;
use crate::error::{PostflowError, Result};
use crate::workflow::traits::ContentGenerator;
use async_trait::async_trait;
use postflow_types::{Campaign, Post};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates social media posts.";
const FALLBACK_TEXT: &str = "Auto-generated post";
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: String,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

pub struct OpenAIClient {
    api_key: String,
    model: String,
    generate_images: bool,
    base_url: String,
    http_client: HttpClient,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            api_key: config.api_key,
            model: config.model,
            generate_images: config.generate_images,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: super::http_client()?,
        })
    }

    fn text_prompt(campaign: &Campaign, attempt: u32) -> String {
        let mut prompt = format!(
            "Write a creative social media post about \"{}\" related to \"{}\".",
            campaign.title, campaign.content
        );
        if attempt > 0 {
            prompt.push_str(" Previous drafts were rejected, so take a noticeably different angle.");
        }
        prompt
    }

    /// The first image prompt written in the campaign sheet, else one built
    /// from the campaign itself
    fn image_prompt(campaign: &Campaign) -> String {
        campaign
            .variants
            .iter()
            .filter_map(|v| v.image_prompt.as_deref())
            .map(str::trim)
            .find(|prompt| !prompt.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Promotional image for: {} - {}, modern social media style",
                    campaign.title, campaign.content
                )
            })
    }

    /// Generate post text; an empty completion falls back to a fixed text
    pub async fn generate_text(&self, campaign: &Campaign, attempt: u32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::text_prompt(campaign, attempt),
                },
            ],
        };

        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::Generation(format!(
                "OpenAI completion returned {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                log::warn!("OpenAI returned no text for '{}', using fallback", campaign.title);
                FALLBACK_TEXT.to_string()
            });

        Ok(text)
    }

    /// Generate an image and return its URL, if one was produced
    pub async fn generate_image(&self, campaign: &Campaign) -> Result<Option<String>> {
        let url = format!("{}/images/generations", self.base_url);
        let request = ImageRequest {
            prompt: Self::image_prompt(campaign),
            n: 1,
            size: IMAGE_SIZE,
        };

        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::Generation(format!(
                "OpenAI image generation returned {}: {}",
                status, error_text
            )));
        }

        let body: ImageResponse = response.json().await?;
        Ok(body.data.into_iter().next().and_then(|d| d.url))
    }
}

#[async_trait]
impl ContentGenerator for OpenAIClient {
    async fn generate(&self, campaign: &Campaign, attempt: u32) -> Result<Post> {
        let text = self.generate_text(campaign, attempt).await?;
        let mut post = Post::new(campaign.title.clone(), text);
        post.variants = campaign.variants.clone();

        if self.generate_images {
            // A post without an image is still reviewable
            match self.generate_image(campaign).await {
                Ok(Some(image_url)) => post = post.with_image(image_url),
                Ok(None) => log::warn!("OpenAI returned no image for '{}'", campaign.title),
                Err(e) => log::warn!("Image generation failed for '{}': {}", campaign.title, e),
            }
        }

        log::info!("Generated post for '{}' (attempt {})", campaign.title, attempt + 1);
        Ok(post)
    }
}
