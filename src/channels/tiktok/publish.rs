//! Publish session initialization (`/v2/post/publish/.../init/`)

use super::chunk::ChunkPlan;
use super::error::PublishError;
use super::status::PublishStatus;
use super::transport::TikTokHttp;
use super::types::{PostSettings, PublishInit, PublishMode};
use log::{error, info};

pub const DIRECT_POST_INIT_PATH: &str = "/v2/post/publish/video/init/";
pub const INBOX_INIT_PATH: &str = "/v2/post/publish/inbox/video/init/";

/// One attempt to get a video onto TikTok, tracked by the provider's `publish_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSession {
    pub publish_id: String,
    pub upload_url: Option<String>,
    pub mode: PublishMode,
    pub video_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
    pub uploaded_chunks: u32,
    pub status: Option<PublishStatus>,
}

impl PublishSession {
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan {
            total_bytes: self.video_size,
            chunk_size: self.chunk_size,
            total_chunks: self.total_chunks,
        }
    }

    pub fn is_fully_uploaded(&self) -> bool {
        self.uploaded_chunks == self.total_chunks
    }
}

/// Destination of a FILE_UPLOAD init.
#[derive(Debug, Clone, Copy)]
pub enum FileUploadTarget<'a> {
    /// Public post; title and settings go out as `post_info`.
    Direct {
        title: &'a str,
        settings: &'a PostSettings,
    },
    /// Draft in the creator's inbox; no post metadata is sent.
    Inbox,
}

#[derive(Debug, Clone)]
pub struct PublishInitializer {
    http: TikTokHttp,
}

impl PublishInitializer {
    pub fn new(http: TikTokHttp) -> Self {
        Self { http }
    }

    /// TikTok downloads the video itself, so there is nothing to upload afterwards.
    pub async fn init_pull_from_url(
        &self,
        access_token: &str,
        video_url: &str,
        title: &str,
        settings: &PostSettings,
    ) -> Result<PublishSession, PublishError> {
        let body = serde_json::json!({
            "post_info": settings.to_post_info(title),
            "source_info": {
                "source": "PULL_FROM_URL",
                "video_url": video_url
            }
        });

        let init: PublishInit = self
            .http
            .post_json(DIRECT_POST_INIT_PATH, access_token, &body)
            .await
            .inspect_err(|e| error!("PULL_FROM_URL init failed: {}", e))?;

        info!("PULL_FROM_URL publish initialized: {}", init.publish_id);

        Ok(PublishSession {
            publish_id: init.publish_id,
            upload_url: None,
            mode: PublishMode::PullFromUrl,
            video_size: 0,
            chunk_size: 0,
            total_chunks: 0,
            uploaded_chunks: 0,
            status: None,
        })
    }

    pub async fn init_file_upload(
        &self,
        access_token: &str,
        target: FileUploadTarget<'_>,
        plan: &ChunkPlan,
    ) -> Result<PublishSession, PublishError> {
        let source_info = serde_json::json!({
            "source": "FILE_UPLOAD",
            "video_size": plan.total_bytes,
            "chunk_size": plan.chunk_size,
            "total_chunk_count": plan.total_chunks
        });

        let (path, body, mode) = match target {
            FileUploadTarget::Direct { title, settings } => (
                DIRECT_POST_INIT_PATH,
                serde_json::json!({
                    "post_info": settings.to_post_info(title),
                    "source_info": source_info
                }),
                PublishMode::FileUploadDirect,
            ),
            FileUploadTarget::Inbox => (
                INBOX_INIT_PATH,
                serde_json::json!({ "source_info": source_info }),
                PublishMode::FileUploadInbox,
            ),
        };

        let result: Result<PublishInit, PublishError> =
            self.http.post_json(path, access_token, &body).await;

        let init = match result {
            Ok(init) => init,
            Err(PublishError::Provider(e)) if mode.is_inbox() => {
                error!(
                    "Inbox init rejected [{}]: {} (log_id: {})",
                    e.code,
                    e.message,
                    e.log_id.as_deref().unwrap_or("-")
                );
                return Err(PublishError::InboxInit(e));
            }
            Err(e) => {
                error!("FILE_UPLOAD init failed ({}): {}", mode, e);
                return Err(e);
            }
        };

        let upload_url = init.upload_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            PublishError::InvalidResponse("FILE_UPLOAD init returned no upload_url".to_string())
        })?;

        info!(
            "FILE_UPLOAD publish initialized ({}): {} with {} chunk(s) of {} bytes",
            mode, init.publish_id, plan.total_chunks, plan.chunk_size
        );

        Ok(PublishSession {
            publish_id: init.publish_id,
            upload_url: Some(upload_url),
            mode,
            video_size: plan.total_bytes,
            chunk_size: plan.chunk_size,
            total_chunks: plan.total_chunks,
            uploaded_chunks: 0,
            status: None,
        })
    }
}
