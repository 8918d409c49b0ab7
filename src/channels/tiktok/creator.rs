//! Creator capabilities (`/v2/post/publish/creator_info/query/`)

use super::error::PublishError;
use super::transport::TikTokHttp;
use super::types::{PrivacyLevel, PublishRequest};
use serde::{Deserialize, Serialize};

pub const CREATOR_INFO_PATH: &str = "/v2/post/publish/creator_info/query/";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatorInfo {
    pub creator_avatar_url: Option<String>,
    pub creator_username: Option<String>,
    pub creator_nickname: Option<String>,
    #[serde(default)]
    pub privacy_level_options: Vec<String>,
    #[serde(default)]
    pub comment_disabled: bool,
    #[serde(default)]
    pub duet_disabled: bool,
    #[serde(default)]
    pub stitch_disabled: bool,
    pub max_video_post_duration_sec: Option<u32>,
}

/// A way in which a request conflicts with what the creator account allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    PrivacyLevelNotOffered(PrivacyLevel),
    CommentsDisabledByCreator,
    DuetDisabledByCreator,
    StitchDisabledByCreator,
    DurationTooLong { duration_sec: u32, max_sec: u32 },
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrivacyLevelNotOffered(level) => {
                write!(f, "Privacy level {level} is not available for this creator")
            }
            Self::CommentsDisabledByCreator => write!(f, "Creator has comments disabled"),
            Self::DuetDisabledByCreator => write!(f, "Creator has duet disabled"),
            Self::StitchDisabledByCreator => write!(f, "Creator has stitch disabled"),
            Self::DurationTooLong {
                duration_sec,
                max_sec,
            } => write!(f, "Video is {duration_sec}s long (max: {max_sec}s)"),
        }
    }
}

impl CreatorInfo {
    pub fn can_post_public(&self) -> bool {
        self.allows_privacy(PrivacyLevel::PublicToEveryone)
    }

    pub fn allows_privacy(&self, level: PrivacyLevel) -> bool {
        self.privacy_level_options
            .iter()
            .any(|opt| opt == level.as_str())
    }

    /// Checks a request against this snapshot. Publishing does not call this;
    /// callers that want to pre-validate do.
    ///
    /// A creator-side disabled interaction conflicts only when the request
    /// leaves that interaction enabled.
    pub fn check_request(
        &self,
        request: &PublishRequest,
        duration_sec: Option<u32>,
    ) -> Vec<ConstraintViolation> {
        let mut violations = vec![];
        let settings = &request.settings;

        if !self.allows_privacy(settings.privacy_level) {
            violations.push(ConstraintViolation::PrivacyLevelNotOffered(
                settings.privacy_level,
            ));
        }
        if self.comment_disabled && !settings.disable_comment {
            violations.push(ConstraintViolation::CommentsDisabledByCreator);
        }
        if self.duet_disabled && !settings.disable_duet {
            violations.push(ConstraintViolation::DuetDisabledByCreator);
        }
        if self.stitch_disabled && !settings.disable_stitch {
            violations.push(ConstraintViolation::StitchDisabledByCreator);
        }
        if let (Some(duration_sec), Some(max_sec)) = (duration_sec, self.max_video_post_duration_sec)
        {
            if duration_sec > max_sec {
                violations.push(ConstraintViolation::DurationTooLong {
                    duration_sec,
                    max_sec,
                });
            }
        }

        violations
    }
}

pub(crate) async fn query_creator_info(
    http: &TikTokHttp,
    access_token: &str,
) -> Result<CreatorInfo, PublishError> {
    http.post_json(CREATOR_INFO_PATH, access_token, &serde_json::json!({}))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::tiktok::types::PostSettings;

    fn creator() -> CreatorInfo {
        CreatorInfo {
            creator_username: Some("studio".to_string()),
            privacy_level_options: vec![
                "FOLLOWER_OF_CREATOR".to_string(),
                "SELF_ONLY".to_string(),
            ],
            duet_disabled: true,
            max_video_post_duration_sec: Some(300),
            ..Default::default()
        }
    }

    #[test]
    fn test_privacy_options() {
        let info = creator();
        assert!(!info.can_post_public());
        assert!(info.allows_privacy(PrivacyLevel::SelfOnly));
    }

    #[test]
    fn test_check_request_reports_every_conflict() {
        let request = PublishRequest::from_url("https://cdn.example/v.mp4").with_settings(
            PostSettings::default().with_privacy(PrivacyLevel::PublicToEveryone),
        );

        let violations = creator().check_request(&request, Some(301));
        assert_eq!(
            violations,
            vec![
                ConstraintViolation::PrivacyLevelNotOffered(PrivacyLevel::PublicToEveryone),
                ConstraintViolation::DuetDisabledByCreator,
                ConstraintViolation::DurationTooLong {
                    duration_sec: 301,
                    max_sec: 300
                },
            ]
        );
    }

    #[test]
    fn test_check_request_passes_when_compatible() {
        let settings = PostSettings {
            disable_duet: true,
            ..Default::default()
        };
        let request = PublishRequest::from_url("https://cdn.example/v.mp4").with_settings(settings);
        assert!(creator().check_request(&request, Some(60)).is_empty());
        assert!(creator().check_request(&request, None).is_empty());
    }

    #[test]
    fn test_parses_provider_payload() {
        let raw = r#"{
            "creator_avatar_url": "https://p16.example/avatar.jpeg",
            "creator_username": "studio",
            "creator_nickname": "Studio",
            "privacy_level_options": ["PUBLIC_TO_EVERYONE", "SELF_ONLY"],
            "comment_disabled": false,
            "duet_disabled": false,
            "stitch_disabled": true,
            "max_video_post_duration_sec": 600
        }"#;
        let info: CreatorInfo = serde_json::from_str(raw).unwrap();
        assert!(info.can_post_public());
        assert!(info.stitch_disabled);
        assert_eq!(info.max_video_post_duration_sec, Some(600));
    }
}
