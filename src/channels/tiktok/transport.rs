//! Thin HTTP layer over the Content Posting API
//!
//! Owns the reqwest clients, base URLs and timeouts. Every JSON call goes
//! through [`TikTokHttp::post_json`], which applies the bearer token and turns
//! the `{data, error}` envelope into a `Result`.

use super::error::{AuthError, ProviderError, PublishError};
use super::types::TikTokApiResponse;
use crate::config::ApiConfig;
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct TikTokHttp {
    pub(crate) client: reqwest::Client,
    /// Separate client with the longer timeout used for video bytes.
    pub(crate) upload_client: reqwest::Client,
    pub(crate) api_base_url: String,
    pub(crate) auth_base_url: String,
}

impl TikTokHttp {
    pub fn new(config: &ApiConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PublishError::Network(e.to_string()))?;
        let upload_client = reqwest::Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .map_err(|e| PublishError::Network(e.to_string()))?;

        Ok(Self {
            client,
            upload_client,
            api_base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_base_url: config.auth_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    /// POSTs a JSON body with the bearer token and unwraps the response envelope.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<T, PublishError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(body)
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(parse_error_response(response).await);
        }

        let api_response: TikTokApiResponse<T> = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        api_response.into_result().map_err(classify_provider_error)
    }
}

/// Provider codes that mean the token itself is unusable.
const AUTH_ERROR_CODES: &[&str] = &["access_token_invalid"];

fn classify_provider_error(err: PublishError) -> PublishError {
    match err {
        PublishError::Provider(e) if AUTH_ERROR_CODES.contains(&e.code.as_str()) => {
            PublishError::Auth(AuthError::Unauthorized(e.message))
        }
        other => other,
    }
}

pub(crate) async fn parse_error_response(response: reqwest::Response) -> PublishError {
    let status = response.status();

    if status.as_u16() == 401 {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TikTokApiResponse<serde_json::Value>>(&text)
            .ok()
            .and_then(|r| r.error)
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Invalid or expired token".to_string());
        return PublishError::Auth(AuthError::Unauthorized(message));
    }

    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get("x-ratelimit-reset")
            .or_else(|| response.headers().get("retry-after"))
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return PublishError::RateLimited { retry_after };
    }

    let error_text = response.text().await.unwrap_or_default();

    if let Ok(api_response) =
        serde_json::from_str::<TikTokApiResponse<serde_json::Value>>(&error_text)
    {
        if let Some(error) = api_response.error {
            error!("TikTok API error {}: [{}] {}", status, error.code, error.message);
            return classify_provider_error(PublishError::Provider(error));
        }
    }

    error!("TikTok API error {}: {}", status, error_text);
    PublishError::Provider(ProviderError {
        code: status.as_u16().to_string(),
        message: error_text,
        log_id: None,
    })
}
