//! Caller-facing publisher
//!
//! Wires the fetcher, planner, initializer, uploader and poller into the three
//! publish flows, and folds every outcome into a [`PublishResult`] so nothing
//! below this layer has to be handled by the caller.

use super::chunk;
use super::creator::{query_creator_info, CreatorInfo};
use super::error::{AuthError, PublishError};
use super::fetcher::VideoFetcher;
use super::oauth::{OAuthCredential, TikTokOAuth};
use super::publish::{FileUploadTarget, PublishInitializer, PublishSession};
use super::status::{PollOutcome, PollReport, StatusPoller};
use super::transport::TikTokHttp;
use super::types::{PostSettings, PublishMode, PublishRequest, VideoSource};
use super::upload::ChunkUploader;
use crate::config::{OAuthAppConfig, TikTokConfig};
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishResult {
    pub success: bool,
    pub publish_id: Option<String>,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    /// Polling ran out of attempts; the job may still complete on TikTok's side.
    pub still_processing: bool,
}

impl PublishResult {
    pub fn from_report(publish_id: String, report: &PollReport) -> Self {
        match &report.outcome {
            PollOutcome::Published { post_id } => Self {
                success: true,
                publish_id: Some(publish_id),
                post_url: post_id.as_deref().map(post_url),
                post_id: post_id.clone(),
                ..Default::default()
            },
            PollOutcome::DeliveredToInbox => Self {
                success: true,
                publish_id: Some(publish_id),
                ..Default::default()
            },
            PollOutcome::Failed { reason } => Self {
                success: false,
                publish_id: Some(publish_id),
                error: Some(reason.clone()),
                error_code: Some("PUBLISH_FAILED".to_string()),
                ..Default::default()
            },
            PollOutcome::Timeout => Self {
                success: false,
                publish_id: Some(publish_id),
                error: Some(format!(
                    "Still processing after {} status checks",
                    report.attempts
                )),
                error_code: Some("PUBLISH_TIMEOUT".to_string()),
                still_processing: true,
                ..Default::default()
            },
        }
    }

    pub fn failure(publish_id: Option<String>, err: &PublishError) -> Self {
        Self {
            success: false,
            publish_id,
            error: Some(err.to_string()),
            error_code: Some(err.code()),
            ..Default::default()
        }
    }
}

pub fn post_url(post_id: &str) -> String {
    format!("https://www.tiktok.com/@/video/{}", post_id)
}

/// Error that happened after (or before) the provider assigned a publish id.
struct SessionFailure {
    publish_id: Option<String>,
    error: PublishError,
}

impl From<PublishError> for SessionFailure {
    fn from(error: PublishError) -> Self {
        Self {
            publish_id: None,
            error,
        }
    }
}

/// One entry of an auto-publish queue.
#[derive(Debug, Clone)]
pub struct PublishJob {
    pub request: PublishRequest,
    pub mode: PublishMode,
}

pub struct TikTokPublisher {
    http: TikTokHttp,
    fetcher: VideoFetcher,
    initializer: PublishInitializer,
    uploader: ChunkUploader,
    poller: StatusPoller,
    oauth: TikTokOAuth,
    app: OAuthAppConfig,
}

impl TikTokPublisher {
    pub fn new(config: TikTokConfig) -> Result<Self, PublishError> {
        let http = TikTokHttp::new(&config.api)?;

        Ok(Self {
            fetcher: VideoFetcher::new(http.upload_client.clone()),
            initializer: PublishInitializer::new(http.clone()),
            uploader: ChunkUploader::new(http.upload_client.clone()),
            poller: StatusPoller::new(config.poll),
            oauth: TikTokOAuth::new(http.client.clone(), &http.api_base_url, &http.auth_base_url),
            app: config.oauth,
            http,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let config = TikTokConfig::load()?;
        Ok(Self::new(config)?)
    }

    pub fn oauth(&self) -> &TikTokOAuth {
        &self.oauth
    }

    // ------------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------------

    /// Direct post where TikTok downloads the video from `video_url` itself.
    pub async fn publish_from_url(
        &self,
        access_token: &str,
        video_url: &str,
        caption: &str,
        hashtags: &[String],
        settings: &PostSettings,
    ) -> PublishResult {
        let request = PublishRequest::from_url(video_url)
            .with_caption(caption)
            .with_hashtags(hashtags.to_vec())
            .with_settings(settings.clone());
        self.publish(access_token, &request, PublishMode::PullFromUrl)
            .await
    }

    /// Direct post: download locally, then upload in chunks.
    pub async fn publish_via_upload(
        &self,
        access_token: &str,
        video_url: &str,
        caption: &str,
        hashtags: &[String],
        settings: &PostSettings,
    ) -> PublishResult {
        let request = PublishRequest::from_url(video_url)
            .with_caption(caption)
            .with_hashtags(hashtags.to_vec())
            .with_settings(settings.clone());
        self.publish(access_token, &request, PublishMode::FileUploadDirect)
            .await
    }

    /// Sends the video to the creator's inbox as a draft.
    pub async fn publish_to_inbox(&self, access_token: &str, video_url: &str) -> PublishResult {
        let request = PublishRequest::from_url(video_url);
        self.publish(access_token, &request, PublishMode::FileUploadInbox)
            .await
    }

    pub async fn publish(
        &self,
        access_token: &str,
        request: &PublishRequest,
        mode: PublishMode,
    ) -> PublishResult {
        match self.run_session(access_token, request, mode).await {
            Ok((session, report)) => PublishResult::from_report(session.publish_id, &report),
            Err(failure) => {
                error!(
                    "TikTok {} publish failed (publish_id: {}): {}",
                    mode,
                    failure.publish_id.as_deref().unwrap_or("-"),
                    failure.error
                );
                PublishResult::failure(failure.publish_id, &failure.error)
            }
        }
    }

    /// Re-polls an existing publish with a fresh attempt budget.
    pub async fn poll_status(
        &self,
        access_token: &str,
        publish_id: &str,
        mode: PublishMode,
    ) -> PublishResult {
        match self
            .poller
            .poll(&self.http, access_token, publish_id, mode)
            .await
        {
            Ok(report) => PublishResult::from_report(publish_id.to_string(), &report),
            Err(e) => PublishResult::failure(Some(publish_id.to_string()), &e),
        }
    }

    /// Runs independent sessions concurrently, at most `concurrency` at a time.
    /// Results come back in job order.
    pub async fn publish_queue(
        &self,
        access_token: &str,
        jobs: Vec<PublishJob>,
        concurrency: usize,
    ) -> Vec<PublishResult> {
        info!(
            "Publishing {} TikTok job(s), {} at a time",
            jobs.len(),
            concurrency.max(1)
        );
        stream::iter(jobs)
            .map(|job| async move { self.publish(access_token, &job.request, job.mode).await })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn run_session(
        &self,
        access_token: &str,
        request: &PublishRequest,
        mode: PublishMode,
    ) -> Result<(PublishSession, PollReport), SessionFailure> {
        let mut session = match mode {
            PublishMode::PullFromUrl => {
                let VideoSource::Url(video_url) = &request.video_source else {
                    return Err(PublishError::InvalidRequest(
                        "PULL_FROM_URL needs a video URL, not an in-memory payload".to_string(),
                    )
                    .into());
                };
                self.initializer
                    .init_pull_from_url(
                        access_token,
                        video_url,
                        &request.title(),
                        &request.settings,
                    )
                    .await?
            }
            PublishMode::FileUploadDirect | PublishMode::FileUploadInbox => {
                let video = match &request.video_source {
                    VideoSource::Url(url) => {
                        self.fetcher.fetch(url).await.map_err(PublishError::from)?
                    }
                    VideoSource::Bytes(bytes) => bytes.clone(),
                };
                let plan = chunk::plan(video.len() as u64).map_err(PublishError::from)?;

                let title = request.title();
                let target = if mode.is_inbox() {
                    FileUploadTarget::Inbox
                } else {
                    FileUploadTarget::Direct {
                        title: &title,
                        settings: &request.settings,
                    }
                };

                let mut session = self
                    .initializer
                    .init_file_upload(access_token, target, &plan)
                    .await?;

                if let Err(e) = self.uploader.upload_all(&mut session, &video).await {
                    return Err(SessionFailure {
                        publish_id: Some(session.publish_id),
                        error: e.into(),
                    });
                }
                session
            }
        };

        let report = match self
            .poller
            .poll_session(&self.http, access_token, &mut session)
            .await
        {
            Ok(report) => report,
            Err(error) => {
                return Err(SessionFailure {
                    publish_id: Some(session.publish_id),
                    error,
                })
            }
        };

        if report.outcome == PollOutcome::Timeout {
            warn!(
                "TikTok publish {} still processing; caller may re-poll",
                session.publish_id
            );
        }

        Ok((session, report))
    }

    // ------------------------------------------------------------------------
    // Creator info and OAuth
    // ------------------------------------------------------------------------

    pub async fn get_creator_info(&self, access_token: &str) -> Result<CreatorInfo, PublishError> {
        query_creator_info(&self.http, access_token).await
    }

    /// Authorization URL for the configured app.
    pub fn get_authorization_url(&self, state: &str, code_verifier: Option<&str>) -> String {
        self.oauth.authorization_url(
            &self.app.client_key,
            &self.app.redirect_uri,
            state,
            code_verifier,
        )
    }

    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthCredential, AuthError> {
        self.oauth
            .exchange_code_for_token(
                &self.app.client_key,
                &self.app.client_secret,
                code,
                &self.app.redirect_uri,
                code_verifier,
            )
            .await
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<OAuthCredential, AuthError> {
        self.oauth
            .refresh(&self.app.client_key, &self.app.client_secret, refresh_token)
            .await
    }

    pub async fn revoke_access_token(&self, access_token: &str) -> Result<(), AuthError> {
        self.oauth
            .revoke_token(&self.app.client_key, &self.app.client_secret, access_token)
            .await
    }
}
