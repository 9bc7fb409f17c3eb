use serde::{Deserialize, Serialize};
use std::fmt;

// ── Platform ────────────────────────────────────────────────────────

/// A live-streaming platform a channel lives on.
///
/// Unrecognised identifiers are kept as `Unknown` rather than rejected so
/// that a typo in the channel list turns into a skipped channel instead of a
/// config load failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Bilibili,
    Douyu,
    Huya,
    Unknown(String),
}

impl Platform {
    /// The platforms this service knows how to query.
    pub const SUPPORTED: [Platform; 3] = [Platform::Bilibili, Platform::Douyu, Platform::Huya];

    pub fn as_str(&self) -> &str {
        match self {
            Platform::Bilibili => "bilibili",
            Platform::Douyu => "douyu",
            Platform::Huya => "huya",
            Platform::Unknown(other) => other,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Platform::Unknown(_))
    }
}

impl From<&str> for Platform {
    fn from(value: &str) -> Self {
        match value {
            "bilibili" => Platform::Bilibili,
            "douyu" => Platform::Douyu,
            "huya" => Platform::Huya,
            other => Platform::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        match Platform::from(value.as_str()) {
            Platform::Unknown(_) => Platform::Unknown(value),
            known => known,
        }
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        match value {
            Platform::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Channel Request ─────────────────────────────────────────────────

/// One channel to query, as listed in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub platform: Platform,
    pub channel_id: String,
    /// Replaces the scraped broadcaster name when non-empty.
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ChannelRequest {
    pub fn new(platform: impl Into<Platform>, channel_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            channel_id: channel_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Cache key: `platform:channel_id`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.platform, self.channel_id)
    }

    /// The override to apply, if any. Empty strings never clobber a name.
    pub fn name_override(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.is_empty())
    }
}

// ── Stream Status ───────────────────────────────────────────────────

/// A channel's live status as reported by its platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamStatus {
    pub channel_id: String,
    pub name: String,
    pub platform: String,
    pub is_live: bool,
    pub title: String,
    #[serde(rename = "game")]
    pub category: String,
    #[serde(rename = "viewers")]
    pub viewer_count: i64,
    pub thumbnail_url: String,
    pub avatar_url: String,
    pub profile_url: String,
    /// Unix seconds at which the platform was read.
    #[serde(rename = "updated_at")]
    pub observed_at: i64,
}

// ── API Envelope ────────────────────────────────────────────────────

/// Response body of the status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub data: Vec<StreamStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn success(data: Vec<StreamStatus>) -> Self {
        Self { status: "success".into(), data, message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), data: Vec::new(), message: Some(message.into()) }
    }
}
