//! TikTok Content Posting API Integration
//!
//! Publishes videos to TikTok either as a public Direct Post (pulled from a URL
//! or uploaded in chunks) or as a draft in the creator's inbox, then polls the
//! publish job to a terminal state. Includes the Login Kit OAuth flow with PKCE.

mod client;
mod creator;
mod error;
mod fetcher;
mod oauth;
mod publish;
mod status;
mod transport;
mod types;
mod upload;

pub mod chunk;

pub use client::{post_url, PublishJob, PublishResult, TikTokPublisher};
pub use creator::{ConstraintViolation, CreatorInfo, CREATOR_INFO_PATH};
pub use error::{AuthError, ChunkPlanError, FetchError, ProviderError, PublishError, UploadError};
pub use fetcher::VideoFetcher;
pub use oauth::{
    code_challenge, generate_code_verifier, generate_state, preview, OAuthCredential,
    TikTokOAuth, PUBLISH_SCOPES,
};
pub use publish::{
    FileUploadTarget, PublishInitializer, PublishSession, DIRECT_POST_INIT_PATH, INBOX_INIT_PATH,
};
pub use status::{
    interpret, PollOutcome, PollReport, PublishState, PublishStatus, StatusPoller, StatusSource,
    StatusVerdict, STATUS_FETCH_PATH,
};
pub use transport::TikTokHttp;
pub use types::{
    build_title, PostSettings, PrivacyLevel, PublishMode, PublishRequest, TikTokApiResponse,
    VideoSource, MAX_TITLE_CHARS,
};
pub use upload::{ChunkUploader, VIDEO_CONTENT_TYPE};
