//! Shared HTTP client for the Lyra document API.
//!
//! Provides the upload intent call (bearer-authenticated JSON) and the direct
//! multipart upload to object storage. The upload flow controller and the CLI
//! use this client directly.

pub mod storage_upload;
pub mod upload_intent;

use anyhow::{Context, Result};
use lyra_core::{ClientConfig, Department, UploadError};
use reqwest::Client;
use serde::de::DeserializeOwned;

pub use storage_upload::{
    ordered_form_fields, DirectUploader, PreparedUpload, StoredObject, CANONICAL_FIELD_ORDER,
};
pub use upload_intent::unwrap_intent_response;

const DEFAULT_UPLOAD_INTENT_PATH: &str = "/documents/upload";

/// HTTP client for the Lyra API. The bearer token is supplied per call.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    upload_intent_path: String,
    default_department: Department,
}

impl ApiClient {
    /// Client with the default intent path and department and no local timeout.
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_intent_path: DEFAULT_UPLOAD_INTENT_PATH.to_string(),
            default_department: Department::default(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            upload_intent_path: config.upload_intent_path.clone(),
            default_department: config.default_department,
        })
    }

    pub fn with_upload_intent_path(mut self, path: impl Into<String>) -> Self {
        self.upload_intent_path = path.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn default_department(&self) -> Department {
        self.default_department
    }

    /// Uploader sharing this client's connection pool.
    pub fn uploader(&self) -> DirectUploader {
        DirectUploader::new(self.client.clone())
    }

    /// POST JSON body with `Authorization: Bearer {token}` and deserialize the response.
    ///
    /// Transport failures and non-2xx statuses become `UploadError::Backend`.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<T, UploadError> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(UploadError::backend_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(url = %url, status = %status, "API request failed");
            return Err(UploadError::Backend {
                status: Some(status.as_u16()),
                body: error_text,
            });
        }

        let text = response
            .text()
            .await
            .map_err(UploadError::backend_transport)?;

        serde_json::from_str(&text).map_err(|e| {
            UploadError::MalformedResponse(format!("Failed to parse response as JSON: {}", e))
        })
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
