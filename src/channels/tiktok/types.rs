//! Request and envelope types shared by the TikTok endpoints

use super::error::{ProviderError, PublishError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Caption limit enforced by TikTok on `post_info.title`.
pub const MAX_TITLE_CHARS: usize = 2200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyLevel {
    PublicToEveryone,
    MutualFollowFriends,
    FollowerOfCreator,
    #[default]
    SelfOnly,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicToEveryone => "PUBLIC_TO_EVERYONE",
            Self::MutualFollowFriends => "MUTUAL_FOLLOW_FRIENDS",
            Self::FollowerOfCreator => "FOLLOWER_OF_CREATOR",
            Self::SelfOnly => "SELF_ONLY",
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-post settings sent as `post_info` for direct posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostSettings {
    pub privacy_level: PrivacyLevel,
    pub disable_duet: bool,
    pub disable_comment: bool,
    pub disable_stitch: bool,
    pub brand_content_toggle: bool,
    pub brand_organic_toggle: bool,
    pub video_cover_timestamp_ms: u64,
}

impl PostSettings {
    pub fn with_privacy(mut self, privacy_level: PrivacyLevel) -> Self {
        self.privacy_level = privacy_level;
        self
    }

    pub(crate) fn to_post_info(&self, title: &str) -> serde_json::Value {
        serde_json::json!({
            "title": title,
            "privacy_level": self.privacy_level,
            "disable_duet": self.disable_duet,
            "disable_comment": self.disable_comment,
            "disable_stitch": self.disable_stitch,
            "video_cover_timestamp_ms": self.video_cover_timestamp_ms,
            "brand_content_toggle": self.brand_content_toggle,
            "brand_organic_toggle": self.brand_organic_toggle
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Url(String),
    Bytes(Bytes),
}

/// Everything needed to publish one video. The publisher only borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub video_source: VideoSource,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub settings: PostSettings,
}

impl PublishRequest {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            video_source: VideoSource::Url(url.into()),
            caption: String::new(),
            hashtags: vec![],
            settings: PostSettings::default(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            video_source: VideoSource::Bytes(bytes.into()),
            caption: String::new(),
            hashtags: vec![],
            settings: PostSettings::default(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_hashtags(mut self, tags: Vec<String>) -> Self {
        self.hashtags.extend(tags);
        self
    }

    pub fn with_settings(mut self, settings: PostSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn title(&self) -> String {
        build_title(&self.caption, &self.hashtags)
    }
}

/// How the video reaches TikTok, which also decides what counts as done.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishMode {
    PullFromUrl,
    FileUploadDirect,
    FileUploadInbox,
}

impl PublishMode {
    pub fn is_inbox(&self) -> bool {
        matches!(self, Self::FileUploadInbox)
    }

    pub fn is_file_upload(&self) -> bool {
        !matches!(self, Self::PullFromUrl)
    }
}

impl std::fmt::Display for PublishMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PullFromUrl => write!(f, "pull_from_url"),
            Self::FileUploadDirect => write!(f, "direct_post"),
            Self::FileUploadInbox => write!(f, "inbox"),
        }
    }
}

/// Caption followed by `#`-prefixed hashtags, cut to [`MAX_TITLE_CHARS`] characters.
pub fn build_title(caption: &str, hashtags: &[String]) -> String {
    let tags = hashtags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.starts_with('#') {
                t.to_string()
            } else {
                format!("#{}", t)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let title = match (caption.is_empty(), tags.is_empty()) {
        (_, true) => caption.to_string(),
        (true, false) => tags,
        (false, false) => format!("{} {}", caption, tags),
    };

    if title.chars().count() > MAX_TITLE_CHARS {
        title.chars().take(MAX_TITLE_CHARS).collect()
    } else {
        title
    }
}

// ============================================================================
// Response envelope
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<ProviderError>,
}

impl<T> TikTokApiResponse<T> {
    /// Splits the envelope: any `error.code` other than `ok` is a failure.
    pub fn into_result(self) -> Result<T, PublishError> {
        if let Some(error) = self.error {
            if error.code != "ok" {
                return Err(PublishError::Provider(error));
            }
        }
        self.data
            .ok_or_else(|| PublishError::InvalidResponse("Response has no data".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishInit {
    pub publish_id: String,
    #[serde(default)]
    pub upload_url: Option<String>,
}
