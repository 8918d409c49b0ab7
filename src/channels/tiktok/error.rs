//! Error types for the TikTok publish client

use serde::{Deserialize, Serialize};

/// Failure downloading the source video.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Video URL is empty")]
    EmptyUrl,
    #[error("Video download failed with HTTP status {0}")]
    HttpStatus(u16),
    #[error("Downloaded video is empty")]
    EmptyBody,
    #[error("Video download network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkPlanError {
    #[error("Cannot plan chunks for an empty video")]
    Empty,
}

/// Non-"ok" error object returned in a Content Posting API envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("TikTok API error [{code}]: {message}")]
pub struct ProviderError {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub log_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error(
        "Chunk {chunk_index} rejected with HTTP status {status} after {uploaded_bytes} bytes: {body}"
    )]
    Rejected {
        chunk_index: u32,
        status: u16,
        body: String,
        uploaded_bytes: u64,
    },
    #[error("Chunk {chunk_index} upload network error after {uploaded_bytes} bytes: {message}")]
    Network {
        chunk_index: u32,
        message: String,
        uploaded_bytes: u64,
    },
    #[error("Video buffer is {actual} bytes but the upload was planned for {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("Publish session has no upload URL")]
    MissingUploadUrl,
}

impl UploadError {
    pub fn chunk_index(&self) -> Option<u32> {
        match self {
            Self::Rejected { chunk_index, .. } | Self::Network { chunk_index, .. } => {
                Some(*chunk_index)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("OAuth request rejected [{error}]: {description}")]
    Rejected {
        error: String,
        description: String,
        log_id: Option<String>,
    },
    #[error("Access token rejected: {0}")]
    Unauthorized(String),
    #[error("OAuth network error: {0}")]
    Network(String),
    #[error("Invalid OAuth response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    ChunkPlan(#[from] ChunkPlanError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Inbox upload init failed [{}]: {}", .0.code, .0.message)]
    InboxInit(ProviderError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Rate limited by TikTok")]
    RateLimited { retry_after: Option<u64> },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid publish request: {0}")]
    InvalidRequest(String),
}

impl PublishError {
    /// Machine-readable code surfaced in `PublishResult::error_code`.
    pub fn code(&self) -> String {
        match self {
            Self::Fetch(_) => "VIDEO_FETCH_FAILED".to_string(),
            Self::ChunkPlan(_) => "INVALID_VIDEO_SIZE".to_string(),
            Self::Provider(e) | Self::InboxInit(e) => e.code.clone(),
            Self::Upload(_) => "CHUNK_UPLOAD_FAILED".to_string(),
            Self::Auth(AuthError::Rejected { error, .. }) => error.clone(),
            Self::Auth(_) => "access_token_invalid".to_string(),
            Self::RateLimited { .. } => "rate_limit_exceeded".to_string(),
            Self::Network(_) => "NETWORK_ERROR".to_string(),
            Self::InvalidResponse(_) => "INVALID_RESPONSE".to_string(),
            Self::InvalidRequest(_) => "INVALID_REQUEST".to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_error_keeps_provider_code() {
        let err = PublishError::InboxInit(ProviderError {
            code: "scope_not_authorized".to_string(),
            message: "video.upload scope missing".to_string(),
            log_id: None,
        });
        assert_eq!(err.code(), "scope_not_authorized");
        assert!(err.to_string().contains("Inbox upload init failed"));
        assert!(err.to_string().contains("video.upload scope missing"));
    }

    #[test]
    fn test_upload_error_chunk_index() {
        let err = UploadError::Rejected {
            chunk_index: 2,
            status: 500,
            body: "boom".to_string(),
            uploaded_bytes: 20,
        };
        assert_eq!(err.chunk_index(), Some(2));
        assert_eq!(UploadError::MissingUploadUrl.chunk_index(), None);
    }
}
