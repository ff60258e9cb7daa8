//! Google Sheets client: campaign rows in, audit rows out

use crate::config::SheetsConfig;
use crate::error::{PostflowError, Result};
use crate::workflow::traits::{AuditLog, CampaignSource};
use async_trait::async_trait;
use postflow_types::{Campaign, Platform, PlatformVariant, PublishStatus};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Platforms in the column order of the campaign sheet, after the title column
const VARIANT_COLUMNS: [Platform; 4] = [
    Platform::LinkedIn,
    Platform::Instagram,
    Platform::Facebook,
    Platform::Twitter,
];
const DATE_COLUMN: usize = 13;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsClient {
    access_token: String,
    spreadsheet_id: String,
    campaign_range: String,
    audit_range: String,
    base_url: String,
    http_client: HttpClient,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Result<Self> {
        Ok(Self {
            access_token: config.access_token,
            spreadsheet_id: config.spreadsheet_id,
            campaign_range: config.campaign_range,
            audit_range: config.audit_range,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client: super::http_client()?,
        })
    }

    /// `{base}/spreadsheets/{id}/values/{range}{suffix}` with the range
    /// encoded as a single path segment
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PostflowError::Config(format!("Invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PostflowError::Config("Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{}{}", range, suffix));
        Ok(url)
    }

    /// Map a campaign row: title, then title/description/image prompt for
    /// each platform, then the date
    pub fn campaign_from_row(row: &[String]) -> Result<Campaign> {
        let cell = |index: usize| {
            row.get(index)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let title = cell(0)
            .ok_or_else(|| PostflowError::Validation("campaign row has no title".to_string()))?;

        let variants: Vec<PlatformVariant> = VARIANT_COLUMNS
            .iter()
            .enumerate()
            .filter_map(|(i, platform)| {
                let base = 1 + i * 3;
                let variant_title = cell(base);
                let description = cell(base + 1);
                if variant_title.is_none() && description.is_none() {
                    return None;
                }
                Some(PlatformVariant {
                    platform: *platform,
                    title: variant_title.unwrap_or(title).to_string(),
                    description: description.unwrap_or_default().to_string(),
                    image_prompt: cell(base + 2).map(str::to_string),
                })
            })
            .collect();

        // The content the generator writes about: the first platform description
        let content = variants
            .iter()
            .map(|v| v.description.as_str())
            .find(|d| !d.is_empty())
            .unwrap_or(title)
            .to_string();

        Ok(Campaign {
            title: title.to_string(),
            content,
            variants,
            date: cell(DATE_COLUMN).map(str::to_string),
        })
    }

    pub fn audit_row(campaign: &Campaign, rejections: u32, results: &[PublishStatus]) -> Vec<String> {
        vec![
            campaign.title.clone(),
            format!("Retries: {}", rejections),
            results.iter().map(|r| r.short()).collect::<Vec<_>>().join(", "),
            chrono::Utc::now().to_rfc3339(),
        ]
    }
}

#[async_trait]
impl CampaignSource for SheetsClient {
    async fn load(&self) -> Result<Campaign> {
        let url = self.values_url(&self.campaign_range, "")?;

        let response = self.http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::ServiceUnavailable(format!(
                "Sheets API error: {}",
                error_text
            )));
        }

        let body: ValueRange = response.json().await?;
        let row = body
            .values
            .first()
            .ok_or_else(|| PostflowError::NotFound("No campaigns found.".to_string()))?;

        let campaign = Self::campaign_from_row(row)?;
        log::info!("Loaded campaign '{}' from sheet", campaign.title);
        Ok(campaign)
    }
}

#[async_trait]
impl AuditLog for SheetsClient {
    async fn record(&self, campaign: &Campaign, rejections: u32, results: &[PublishStatus]) -> Result<()> {
        let url = self.values_url(&self.audit_range, ":append")?;
        let payload = json!({ "values": [Self::audit_row(campaign, rejections, results)] });

        let response = self.http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PostflowError::ServiceUnavailable(format!(
                "Sheets append failed: {}",
                error_text
            )));
        }

        log::info!("Audit row written for '{}'", campaign.title);
        Ok(())
    }
}

/// Fixed campaign used when no sheet is configured
#[derive(Debug, Clone)]
pub struct StaticCampaignSource {
    campaign: Campaign,
}

impl StaticCampaignSource {
    pub fn new(campaign: Campaign) -> Self {
        Self { campaign }
    }
}

impl Default for StaticCampaignSource {
    fn default() -> Self {
        Self::new(Campaign::new("Launch Campaign", "This is a sample campaign."))
    }
}

#[async_trait]
impl CampaignSource for StaticCampaignSource {
    async fn load(&self) -> Result<Campaign> {
        Ok(self.campaign.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> SheetsClient {
        SheetsClient::new(SheetsConfig {
            access_token: "ya29.test".to_string(),
            spreadsheet_id: "sheet-1".to_string(),
            campaign_range: "Campaigns!A2:N".to_string(),
            audit_range: "Log!A:D".to_string(),
            base_url: base_url.to_string(),
        })
        .unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_campaign_from_full_row() {
        let campaign = SheetsClient::campaign_from_row(&row(&[
            "Spring Sale",
            "LI title", "LI desc", "LI prompt",
            "IG title", "IG desc", "",
            "", "", "",
            "X title", "X desc", "X prompt",
            "2024-04-01",
        ]))
        .unwrap();

        assert_eq!(campaign.title, "Spring Sale");
        assert_eq!(campaign.content, "LI desc");
        assert_eq!(campaign.variants.len(), 3);
        assert!(campaign.variant(Platform::Facebook).is_none());
        assert_eq!(campaign.variant(Platform::Instagram).unwrap().image_prompt, None);
        assert_eq!(campaign.variant(Platform::Twitter).unwrap().description, "X desc");
        assert_eq!(campaign.date.as_deref(), Some("2024-04-01"));
    }

    #[test]
    fn test_short_row_and_missing_title() {
        let campaign = SheetsClient::campaign_from_row(&row(&["Only title"])).unwrap();
        assert_eq!(campaign.content, "Only title");
        assert!(campaign.variants.is_empty());

        assert!(SheetsClient::campaign_from_row(&row(&["  "])).is_err());
    }

    #[test]
    fn test_audit_row_shape() {
        let row = SheetsClient::audit_row(
            &Campaign::new("Launch", "c"),
            2,
            &[
                PublishStatus::succeeded(Platform::LinkedIn),
                PublishStatus::failed(Platform::Twitter, "down"),
            ],
        );
        assert_eq!(row[0], "Launch");
        assert_eq!(row[1], "Retries: 2");
        assert_eq!(row[2], "LinkedIn:ok, Twitter:failed");
        assert_eq!(row.len(), 4);
    }

    #[tokio::test]
    async fn test_load_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-1/values/Campaigns!A2:N"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Campaigns!A2:N",
                "values": [["Launch", "LI", "Hello LinkedIn"], ["Second"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let campaign = client(&server.uri()).load().await.unwrap();
        assert_eq!(campaign.title, "Launch");
        assert_eq!(campaign.content, "Hello LinkedIn");
    }

    #[tokio::test]
    async fn test_load_empty_sheet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "x"})))
            .mount(&server)
            .await;

        let err = client(&server.uri()).load().await.unwrap_err();
        assert!(matches!(err, PostflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_appends_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1/values/Log!A:D:append"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri())
            .record(&Campaign::new("Launch", "c"), 0, &[PublishStatus::succeeded(Platform::LinkedIn)])
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["values"][0][0], "Launch");
        assert_eq!(body["values"][0][1], "Retries: 0");
        assert_eq!(body["values"][0][2], "LinkedIn:ok");
    }

    #[test]
    fn test_range_with_spaces_is_one_segment() {
        let url = client("https://sheets.example/v4").values_url("My Log!A:D", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example/v4/spreadsheets/sheet-1/values/My%20Log!A:D:append"
        );
    }

    #[tokio::test]
    async fn test_static_source() {
        let campaign = StaticCampaignSource::default().load().await.unwrap();
        assert_eq!(campaign.title, "Launch Campaign");
    }
}
