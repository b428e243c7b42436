use crate::error::SendError;
use crate::models::ExtractedAd;
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// Destination for extracted ads
#[async_trait]
pub trait AdSink: Send + Sync {
    async fn submit(&self, ad: &ExtractedAd) -> Result<(), SendError>;
}

/// POSTs each ad as JSON to the collector endpoint
#[derive(Debug, Clone)]
pub struct CollectorClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl CollectorClient {
    pub fn new(client: Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl AdSink for CollectorClient {
    async fn submit(&self, ad: &ExtractedAd) -> Result<(), SendError> {
        info!(ad_id = %ad.ad_id, "📤 Sending ad to collector...");

        let mut request = self.client.post(&self.endpoint).json(ad);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SendError::Status(response.status()));
        }

        Ok(())
    }
}
