use crate::error::ClientError;
use crate::interaction::RouteSource;
use crate::serial::Uploader;
use crate::types::{points_from_features, RouteId, RoutePoint, UploadReceipt};
use async_trait::async_trait;
use geojson::FeatureCollection;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the route service
///
/// Used by the serial uploader to push logs and by the viewer to list and
/// fetch routes. Requests time out after 30 seconds.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("slopemap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Submit one raw log buffer as a new route
    pub async fn upload(&self, data: &str) -> Result<UploadReceipt, ClientError> {
        let response = self
            .client
            .post(self.url("uploadData"))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode(response).await
    }

    pub async fn list_route_ids(&self) -> Result<Vec<RouteId>, ClientError> {
        let response = self.client.get(self.url("getAllDocumentIds")).send().await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode(response).await
    }

    pub async fn fetch_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, ClientError> {
        let response = self
            .client
            .get(self.url("getRouteData"))
            .query(&[("docId", id.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(id.clone())),
            status if !status.is_success() => Err(rejection(response).await),
            _ => {
                let collection: FeatureCollection = decode(response).await?;
                Ok(points_from_features(&collection))
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn rejection(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);

    ClientError::Rejected { status, message }
}

#[async_trait]
impl RouteSource for ApiClient {
    async fn list_route_ids(&self) -> Result<Vec<RouteId>, ClientError> {
        ApiClient::list_route_ids(self).await
    }

    async fn fetch_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, ClientError> {
        ApiClient::fetch_route(self, id).await
    }
}

#[async_trait]
impl Uploader for ApiClient {
    async fn upload(&self, data: &str) -> Result<UploadReceipt, ClientError> {
        ApiClient::upload(self, data).await
    }
}
