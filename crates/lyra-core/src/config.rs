//! Configuration module
//!
//! Client configuration is read once at startup and passed explicitly to the
//! session provider and API client; nothing is configured through globals.

use std::env;
use std::time::Duration;

use crate::models::Department;

const DEFAULT_UPLOAD_INTENT_PATH: &str = "/documents/upload";
const DEFAULT_COGNITO_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend that issues upload descriptors
    pub api_url: String,
    /// Path of the upload intent endpoint, relative to `api_url`
    pub upload_intent_path: String,
    /// Department sent when the user leaves it unset
    pub default_department: Department,
    pub cognito_region: String,
    pub cognito_user_pool_id: Option<String>,
    /// Only the account commands and password sign-in need it
    pub cognito_client_id: Option<String>,
    /// Endpoint override for local stacks and tests; the regional endpoint otherwise
    pub cognito_endpoint: Option<String>,
    /// Optional request timeout; unset leaves the HTTP stack defaults in place
    pub http_timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_vars(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary variable source (the process environment in `from_env`).
    pub fn from_vars<F>(get: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = get("LYRA_API_URL")
            .or_else(|| get("API_URL"))
            .ok_or_else(|| anyhow::anyhow!("LYRA_API_URL must be set"))?;

        let upload_intent_path = get("LYRA_UPLOAD_INTENT_PATH")
            .unwrap_or_else(|| DEFAULT_UPLOAD_INTENT_PATH.to_string());

        let default_department = match get("LYRA_DEFAULT_DEPARTMENT") {
            Some(value) => value
                .parse()
                .map_err(|e| anyhow::anyhow!("LYRA_DEFAULT_DEPARTMENT is invalid: {}", e))?,
            None => Department::default(),
        };

        let cognito_region =
            get("COGNITO_REGION").unwrap_or_else(|| DEFAULT_COGNITO_REGION.to_string());

        let http_timeout_secs = match get("LYRA_HTTP_TIMEOUT_SECS") {
            Some(value) => Some(
                value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("LYRA_HTTP_TIMEOUT_SECS must be a valid number"))?,
            ),
            None => None,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_intent_path,
            default_department,
            cognito_region,
            cognito_user_pool_id: get("COGNITO_USER_POOL_ID"),
            cognito_client_id: get("COGNITO_CLIENT_ID"),
            cognito_endpoint: get("COGNITO_ENDPOINT"),
            http_timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !is_http_url(&self.api_url) {
            return Err(anyhow::anyhow!(
                "LYRA_API_URL must start with http:// or https://"
            ));
        }

        if let Some(endpoint) = &self.cognito_endpoint {
            if !is_http_url(endpoint) {
                return Err(anyhow::anyhow!(
                    "COGNITO_ENDPOINT must start with http:// or https://"
                ));
            }
        }

        if let Some(client_id) = &self.cognito_client_id {
            if client_id.trim().is_empty() {
                return Err(anyhow::anyhow!("COGNITO_CLIENT_ID cannot be empty"));
            }
        }

        if !self.upload_intent_path.starts_with('/') {
            return Err(anyhow::anyhow!(
                "LYRA_UPLOAD_INTENT_PATH must start with '/'"
            ));
        }

        // Pool ids look like "us-east-1_AbCdEf"; a mismatched region prefix means a misconfigured pool.
        if let Some(pool_id) = &self.cognito_user_pool_id {
            let prefix = format!("{}_", self.cognito_region);
            if !pool_id.starts_with(&prefix) {
                return Err(anyhow::anyhow!(
                    "COGNITO_USER_POOL_ID {} does not belong to region {}",
                    pool_id,
                    self.cognito_region
                ));
            }
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
