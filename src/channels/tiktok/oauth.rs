//! TikTok Login Kit OAuth 2.0: authorization URL with PKCE, code exchange,
//! refresh and revoke.
//!
//! Credentials are passed explicitly on every call; nothing is stored here.
//! Secrets only ever reach the log as [`preview`]s.

use super::error::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use log::{error, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const AUTHORIZE_PATH: &str = "/v2/auth/authorize/";
pub const TOKEN_PATH: &str = "/v2/oauth/token/";
pub const REVOKE_PATH: &str = "/v2/oauth/revoke/";

/// Publish, inbox upload and basic profile.
pub const PUBLISH_SCOPES: &str = "user.info.basic,video.publish,video.upload";

const PREVIEW_CHARS: usize = 10;
const VERIFIER_LEN: usize = 64;
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// First 10 characters followed by `...`, for logging identifiers and secrets.
pub fn preview(secret: &str) -> String {
    if secret.chars().count() <= PREVIEW_CHARS {
        return "*".repeat(secret.chars().count());
    }
    let head: String = secret.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

/// Random RFC 7636 code verifier (64 unreserved characters).
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    (0..VERIFIER_LEN)
        .map(|_| VERIFIER_CHARSET[rng.gen_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

/// `S256` challenge: base64url(SHA-256(verifier)) without padding.
pub fn code_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Opaque CSRF value for the `state` parameter.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub refresh_expires_in: u64,
    pub open_id: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("access_token", &preview(&self.access_token))
            .field("refresh_token", &preview(&self.refresh_token))
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("open_id", &self.open_id)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl OAuthCredential {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + chrono::Duration::seconds(self.expires_in as i64)
    }

    pub fn refresh_expires_at(&self) -> DateTime<Utc> {
        self.issued_at + chrono::Duration::seconds(self.refresh_expires_in as i64)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// True within five minutes of expiry.
    pub fn needs_refresh(&self) -> bool {
        Utc::now() >= self.expires_at() - chrono::Duration::minutes(5)
    }

    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// The token endpoint answers either with a credential or with `error` fields,
/// sometimes under HTTP 200.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    refresh_expires_in: Option<u64>,
    open_id: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    log_id: Option<String>,
}

impl TokenEndpointResponse {
    fn into_credential(self) -> Result<OAuthCredential, AuthError> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(AuthError::Rejected {
                error,
                description: self.error_description.unwrap_or_default(),
                log_id: self.log_id,
            });
        }

        let access_token = self
            .access_token
            .ok_or_else(|| AuthError::InvalidResponse("missing access_token".to_string()))?;

        Ok(OAuthCredential {
            access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            expires_in: self.expires_in.unwrap_or_default(),
            refresh_expires_in: self.refresh_expires_in.unwrap_or_default(),
            open_id: self.open_id.unwrap_or_default(),
            scope: self.scope.unwrap_or_default(),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            issued_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TikTokOAuth {
    client: reqwest::Client,
    api_base_url: String,
    auth_base_url: String,
}

impl TikTokOAuth {
    pub fn new(client: reqwest::Client, api_base_url: &str, auth_base_url: &str) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Browser redirect target. With a verifier, adds an `S256` PKCE challenge.
    pub fn authorization_url(
        &self,
        client_key: &str,
        redirect_uri: &str,
        state: &str,
        code_verifier: Option<&str>,
    ) -> String {
        let mut url = format!(
            "{}{}?client_key={}&scope={}&response_type=code&redirect_uri={}&state={}",
            self.auth_base_url,
            AUTHORIZE_PATH,
            urlencoding::encode(client_key),
            urlencoding::encode(PUBLISH_SCOPES),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        );

        if let Some(verifier) = code_verifier {
            url.push_str("&code_challenge=");
            url.push_str(&code_challenge(verifier));
            url.push_str("&code_challenge_method=S256");
        }

        info!(
            "Built TikTok authorization URL for client {} (pkce: {})",
            preview(client_key),
            code_verifier.is_some()
        );
        url
    }

    pub async fn exchange_code_for_token(
        &self,
        client_key: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthCredential, AuthError> {
        let mut form = vec![
            ("client_key", client_key),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        info!(
            "Exchanging TikTok authorization code for client {}",
            preview(client_key)
        );
        let credential = self.token_request(&form).await?;
        info!(
            "TikTok token issued for open_id {} (expires in {}s)",
            credential.open_id, credential.expires_in
        );
        Ok(credential)
    }

    /// Produces a new credential; the old one is left untouched.
    pub async fn refresh(
        &self,
        client_key: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<OAuthCredential, AuthError> {
        info!(
            "Refreshing TikTok token {} for client {}",
            preview(refresh_token),
            preview(client_key)
        );
        self.token_request(&[
            ("client_key", client_key),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    pub async fn revoke_token(
        &self,
        client_key: &str,
        client_secret: &str,
        access_token: &str,
    ) -> Result<(), AuthError> {
        let url = format!("{}{}", self.api_base_url, REVOKE_PATH);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&[
                ("client_key", client_key),
                ("client_secret", client_secret),
                ("token", access_token),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if let Ok(body) = serde_json::from_str::<TokenEndpointResponse>(&text) {
            if let Some(error) = body.error.filter(|e| !e.is_empty()) {
                return Err(AuthError::Rejected {
                    error,
                    description: body.error_description.unwrap_or_default(),
                    log_id: body.log_id,
                });
            }
        }

        if !status.is_success() {
            return Err(AuthError::Rejected {
                error: status.as_u16().to_string(),
                description: text,
                log_id: None,
            });
        }

        info!("Revoked TikTok token {}", preview(access_token));
        Ok(())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<OAuthCredential, AuthError> {
        let url = format!("{}{}", self.api_base_url, TOKEN_PATH);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let body: TokenEndpointResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(AuthError::InvalidResponse(e.to_string()));
            }
            Err(_) => {
                error!("TikTok token endpoint returned HTTP {}", status);
                return Err(AuthError::Rejected {
                    error: status.as_u16().to_string(),
                    description: text,
                    log_id: None,
                });
            }
        };

        body.into_credential().inspect_err(|e| {
            error!("TikTok token request failed: {}", e);
        })
    }
}
