//! LinkedIn publisher: image upload plus UGC post

use crate::config::LinkedInConfig;
use crate::error::{PostflowError, Result};
use crate::workflow::traits::Publisher;
use async_trait::async_trait;
use postflow_types::{Platform, Post};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};

const RESTLI_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_VERSION: &str = "2.0.0";
const UPLOAD_MECHANISM: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

#[derive(Debug, Deserialize)]
struct RegisterUploadResponse {
    value: RegisterUploadValue,
}

#[derive(Debug, Deserialize)]
struct RegisterUploadValue {
    asset: String,
    #[serde(rename = "uploadMechanism")]
    upload_mechanism: Value,
}

/// An uploaded image asset ready to be referenced from a post
#[derive(Debug, Clone, PartialEq, Eq)]
struct UploadedAsset {
    asset: String,
    upload_url: String,
}

pub struct LinkedInPublisher {
    access_token: String,
    author_urn: String,
    base_url: String,
    http_client: HttpClient,
}

impl LinkedInPublisher {
    pub fn new(config: LinkedInConfig) -> Result<Self> {
        Ok(Self {
            access_token: config.access_token,
            author_urn: config.author_urn,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: super::http_client()?,
        })
    }

    fn publish_error(reason: impl Into<String>) -> PostflowError {
        PostflowError::Publish {
            platform: Platform::LinkedIn.to_string(),
            reason: reason.into(),
        }
    }

    async fn register_upload(&self) -> Result<UploadedAsset> {
        let url = format!("{}/assets?action=registerUpload", self.base_url);
        let payload = json!({
            "registerUploadRequest": {
                "owner": self.author_urn,
                "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                "serviceRelationships": [
                    {"identifier": "urn:li:userGeneratedContent", "relationshipType": "OWNER"}
                ]
            }
        });

        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(RESTLI_HEADER, RESTLI_VERSION)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::publish_error(format!("registerUpload failed: {}", error_text)));
        }

        let body: RegisterUploadResponse = response.json().await?;
        let upload_url = body.value.upload_mechanism[UPLOAD_MECHANISM]["uploadUrl"]
            .as_str()
            .ok_or_else(|| Self::publish_error("registerUpload response has no upload URL"))?
            .to_string();

        Ok(UploadedAsset {
            asset: body.value.asset,
            upload_url,
        })
    }

    /// Fetch the generated image and push its bytes to LinkedIn
    async fn upload_image(&self, image_url: &str) -> Result<String> {
        let uploaded = self.register_upload().await?;

        let image = self.http_client.get(image_url).send().await?;
        if !image.status().is_success() {
            return Err(Self::publish_error("Failed to fetch generated image"));
        }
        let bytes = image.bytes().await?;

        let response = self.http_client
            .put(&uploaded.upload_url)
            .bearer_auth(&self.access_token)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::publish_error(format!("Image upload failed: {}", response.status())));
        }

        Ok(uploaded.asset)
    }

    fn ugc_post_body(&self, text: &str, asset: Option<&str>) -> Value {
        let media = match asset {
            Some(asset) => json!([{
                "status": "READY",
                "description": {"text": text},
                "media": asset,
                "title": {"text": "Campaign Image"}
            }]),
            None => json!([]),
        };

        json!({
            "author": self.author_urn,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": {"text": text},
                    "shareMediaCategory": if asset.is_some() { "IMAGE" } else { "NONE" },
                    "media": media
                }
            },
            "visibility": {"com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"}
        })
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn publish(&self, post: &Post) -> Result<()> {
        let text = post.text_for(Platform::LinkedIn);

        let asset = match &post.image_url {
            Some(image_url) => Some(self.upload_image(image_url).await?),
            None => None,
        };

        let url = format!("{}/ugcPosts", self.base_url);
        let response = self.http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(RESTLI_HEADER, RESTLI_VERSION)
            .json(&self.ugc_post_body(text, asset.as_deref()))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::publish_error(error_text));
        }

        Ok(())
    }
}
