//! Publish status polling
//!
//! TikTok processes a publish asynchronously. The poller re-queries
//! `/v2/post/publish/status/fetch/` on a fixed interval until it sees a
//! terminal state for the session's [`PublishMode`] or runs out of attempts.
//! Running out of attempts is reported as [`PollOutcome::Timeout`], not as an
//! error, because the job may still finish on TikTok's side.

use super::error::PublishError;
use super::publish::PublishSession;
use super::transport::TikTokHttp;
use super::types::PublishMode;
use crate::config::PollConfig;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};

pub const STATUS_FETCH_PATH: &str = "/v2/post/publish/status/fetch/";

/// Provider-side state of a publish. Unrecognized values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PublishState {
    ProcessingUpload,
    ProcessingDownload,
    SendToUserInbox,
    PublishComplete,
    Failed,
    Unknown(String),
}

impl From<String> for PublishState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PROCESSING_UPLOAD" => Self::ProcessingUpload,
            "PROCESSING_DOWNLOAD" => Self::ProcessingDownload,
            "SEND_TO_USER_INBOX" => Self::SendToUserInbox,
            "PUBLISH_COMPLETE" => Self::PublishComplete,
            "FAILED" => Self::Failed,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<PublishState> for String {
    fn from(state: PublishState) -> Self {
        state.as_str().to_string()
    }
}

impl PublishState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProcessingUpload => "PROCESSING_UPLOAD",
            Self::ProcessingDownload => "PROCESSING_DOWNLOAD",
            Self::SendToUserInbox => "SEND_TO_USER_INBOX",
            Self::PublishComplete => "PUBLISH_COMPLETE",
            Self::Failed => "FAILED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for PublishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub status: PublishState,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default)]
    pub uploaded_bytes: Option<u64>,
    #[serde(default)]
    pub downloaded_bytes: Option<u64>,
    // TikTok spells the field "publicaly"; accept both.
    #[serde(
        default,
        alias = "publicaly_available_post_id",
        deserialize_with = "deserialize_post_ids"
    )]
    pub publicly_available_post_id: Vec<String>,
}

impl PublishStatus {
    pub fn new(status: PublishState) -> Self {
        Self {
            status,
            fail_reason: None,
            uploaded_bytes: None,
            downloaded_bytes: None,
            publicly_available_post_id: vec![],
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        self.publicly_available_post_id.first().map(|s| s.as_str())
    }
}

/// Post ids arrive as int64 in production and as strings in some sandboxes.
fn deserialize_post_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusVerdict {
    Continue,
    Succeeded,
    Failed,
}

/// Total over every (state, mode) pair; SEND_TO_USER_INBOX is only final for inbox uploads.
pub fn interpret(state: &PublishState, mode: PublishMode) -> StatusVerdict {
    match (state, mode) {
        (PublishState::ProcessingUpload, _) | (PublishState::ProcessingDownload, _) => {
            StatusVerdict::Continue
        }
        (PublishState::SendToUserInbox, PublishMode::FileUploadInbox) => StatusVerdict::Succeeded,
        (PublishState::SendToUserInbox, PublishMode::FileUploadDirect)
        | (PublishState::SendToUserInbox, PublishMode::PullFromUrl) => StatusVerdict::Continue,
        (PublishState::PublishComplete, _) => StatusVerdict::Succeeded,
        (PublishState::Failed, _) => StatusVerdict::Failed,
        (PublishState::Unknown(_), _) => StatusVerdict::Continue,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Published { post_id: Option<String> },
    DeliveredToInbox,
    Failed { reason: String },
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub attempts: u32,
    pub last_status: Option<PublishStatus>,
}

#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        access_token: &str,
        publish_id: &str,
    ) -> Result<PublishStatus, PublishError>;
}

#[async_trait::async_trait]
impl StatusSource for TikTokHttp {
    async fn fetch_status(
        &self,
        access_token: &str,
        publish_id: &str,
    ) -> Result<PublishStatus, PublishError> {
        let body = serde_json::json!({ "publish_id": publish_id });
        self.post_json(STATUS_FETCH_PATH, access_token, &body).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Polls until a terminal state or `max_attempts`. A failed status request
    /// ends polling with `Err`; it is not retried.
    pub async fn poll(
        &self,
        source: &dyn StatusSource,
        access_token: &str,
        publish_id: &str,
        mode: PublishMode,
    ) -> Result<PollReport, PublishError> {
        let mut last_status: Option<PublishStatus> = None;

        for attempt in 1..=self.config.max_attempts {
            let status = source.fetch_status(access_token, publish_id).await?;
            debug!(
                "Publish {} status {} (attempt {}/{})",
                publish_id, status.status, attempt, self.config.max_attempts
            );

            let outcome = match interpret(&status.status, mode) {
                StatusVerdict::Succeeded if status.status == PublishState::SendToUserInbox => {
                    info!("Publish {} delivered to creator inbox", publish_id);
                    Some(PollOutcome::DeliveredToInbox)
                }
                StatusVerdict::Succeeded => {
                    let post_id = status.post_id().map(String::from);
                    info!(
                        "Publish {} complete (post id: {})",
                        publish_id,
                        post_id.as_deref().unwrap_or("-")
                    );
                    Some(PollOutcome::Published { post_id })
                }
                StatusVerdict::Failed => {
                    let reason = status
                        .fail_reason
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string());
                    warn!("Publish {} failed: {}", publish_id, reason);
                    Some(PollOutcome::Failed { reason })
                }
                StatusVerdict::Continue => {
                    if let PublishState::Unknown(raw) = &status.status {
                        warn!("Publish {} reported unexpected status {}", publish_id, raw);
                    }
                    None
                }
            };

            if let Some(outcome) = outcome {
                return Ok(PollReport {
                    outcome,
                    attempts: attempt,
                    last_status: Some(status),
                });
            }

            last_status = Some(status);
            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        warn!(
            "Publish {} still processing after {} attempts",
            publish_id, self.config.max_attempts
        );
        Ok(PollReport {
            outcome: PollOutcome::Timeout,
            attempts: self.config.max_attempts,
            last_status,
        })
    }

    /// Same as [`poll`](Self::poll), recording the last observed status on the session.
    pub async fn poll_session(
        &self,
        source: &dyn StatusSource,
        access_token: &str,
        session: &mut PublishSession,
    ) -> Result<PollReport, PublishError> {
        let report = self
            .poll(source, access_token, &session.publish_id, session.mode)
            .await?;
        if report.last_status.is_some() {
            session.status = report.last_status.clone();
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedSource {
        script: Mutex<VecDeque<Result<PublishStatus, PublishError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(states: Vec<PublishState>) -> Self {
            Self {
                script: Mutex::new(states.into_iter().map(|s| Ok(PublishStatus::new(s))).collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn with_results(results: Vec<Result<PublishStatus, PublishError>>) -> Self {
            Self {
                script: Mutex::new(results.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _: &str, _: &str) -> Result<PublishStatus, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("poller asked for more statuses than scripted")
        }
    }

    fn poller(max_attempts: u32) -> StatusPoller {
        StatusPoller::new(PollConfig {
            interval: Duration::from_secs(5),
            max_attempts,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_three_polls() {
        let source = ScriptedSource::new(vec![
            PublishState::ProcessingUpload,
            PublishState::ProcessingDownload,
            PublishState::PublishComplete,
        ]);
        let start = tokio::time::Instant::now();

        let report = poller(30)
            .poll(&source, "tok", "pub-1", PublishMode::FileUploadDirect)
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Published { post_id: None });
        assert_eq!(report.attempts, 3);
        assert_eq!(source.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let source = ScriptedSource::new(vec![PublishState::ProcessingUpload; 31]);

        let report = poller(30)
            .poll(&source, "tok", "pub-1", PublishMode::FileUploadDirect)
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Timeout);
        assert_eq!(report.attempts, 30);
        assert_eq!(source.calls(), 30);
        assert_eq!(
            report.last_status.map(|s| s.status),
            Some(PublishState::ProcessingUpload)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbox_status_is_terminal_only_for_inbox() {
        let inbox = ScriptedSource::new(vec![PublishState::SendToUserInbox]);
        let report = poller(30)
            .poll(&inbox, "tok", "pub-1", PublishMode::FileUploadInbox)
            .await
            .unwrap();
        assert_eq!(report.outcome, PollOutcome::DeliveredToInbox);
        assert_eq!(inbox.calls(), 1);

        let direct = ScriptedSource::new(vec![
            PublishState::SendToUserInbox,
            PublishState::PublishComplete,
        ]);
        let report = poller(30)
            .poll(&direct, "tok", "pub-2", PublishMode::FileUploadDirect)
            .await
            .unwrap();
        assert_eq!(report.outcome, PollOutcome::Published { post_id: None });
        assert_eq!(direct.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_carries_reason() {
        let mut failed = PublishStatus::new(PublishState::Failed);
        failed.fail_reason = Some("video_pull_failed".to_string());
        let source = ScriptedSource::with_results(vec![
            Ok(PublishStatus::new(PublishState::ProcessingDownload)),
            Ok(failed),
        ]);

        let report = poller(30)
            .poll(&source, "tok", "pub-1", PublishMode::PullFromUrl)
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            PollOutcome::Failed {
                reason: "video_pull_failed".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let source = ScriptedSource::new(vec![
            PublishState::Unknown("MODERATION_REVIEW".to_string()),
            PublishState::PublishComplete,
        ]);
        let report = poller(5)
            .poll(&source, "tok", "pub-1", PublishMode::FileUploadDirect)
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_stops_polling() {
        let source = ScriptedSource::with_results(vec![
            Ok(PublishStatus::new(PublishState::ProcessingUpload)),
            Err(PublishError::Network("connection reset".to_string())),
        ]);
        let result = poller(30)
            .poll(&source, "tok", "pub-1", PublishMode::FileUploadDirect)
            .await;
        assert_eq!(
            result,
            Err(PublishError::Network("connection reset".to_string()))
        );
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_times_out_without_polling() {
        let source = ScriptedSource::new(vec![]);
        let report = poller(0)
            .poll(&source, "tok", "pub-1", PublishMode::FileUploadDirect)
            .await
            .unwrap();
        assert_eq!(report.outcome, PollOutcome::Timeout);
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_interpret_is_mode_aware() {
        use PublishMode::*;
        let cases = [
            (PublishState::ProcessingUpload, FileUploadInbox, StatusVerdict::Continue),
            (PublishState::ProcessingDownload, PullFromUrl, StatusVerdict::Continue),
            (PublishState::SendToUserInbox, FileUploadInbox, StatusVerdict::Succeeded),
            (PublishState::SendToUserInbox, FileUploadDirect, StatusVerdict::Continue),
            (PublishState::SendToUserInbox, PullFromUrl, StatusVerdict::Continue),
            (PublishState::PublishComplete, FileUploadInbox, StatusVerdict::Succeeded),
            (PublishState::Failed, FileUploadDirect, StatusVerdict::Failed),
        ];
        for (state, mode, expected) in cases {
            assert_eq!(interpret(&state, mode), expected, "{} / {}", state, mode);
        }
    }

    #[test]
    fn test_status_parses_misspelled_post_ids() {
        let raw = r#"{"status":"PUBLISH_COMPLETE","publicaly_available_post_id":[7301234567890123456],"uploaded_bytes":1024}"#;
        let status: PublishStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.status, PublishState::PublishComplete);
        assert_eq!(status.post_id(), Some("7301234567890123456"));
        assert_eq!(status.uploaded_bytes, Some(1024));

        let raw = r#"{"status":"NEW_STATE"}"#;
        let status: PublishStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.status, PublishState::Unknown("NEW_STATE".to_string()));
        assert!(status.post_id().is_none());
    }
}
