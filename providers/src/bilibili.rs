//! Bilibili provider — room info plus a best-effort anchor lookup.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::*;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoomInfo {
    live_status: i64,
    title: String,
    room_id: i64,
    online: i64,
    keyframe: String,
    area_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnchorData {
    info: AnchorInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnchorInfo {
    uname: String,
    face: String,
}

pub struct BilibiliProvider {
    transport: Arc<dyn Transport>,
}

impl BilibiliProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn anchor_info(&self, room_id: i64) -> Result<AnchorInfo, ProviderError> {
        let url = format!(
            "https://api.live.bilibili.com/live_user/v1/UserInfo/get_anchor_in_room?roomid={}",
            room_id
        );
        let body = self.transport.get_text(&url).await?;
        parse_anchor_info(&body)
    }
}

fn unwrap_envelope<T: Default>(envelope: Envelope<T>) -> Result<T, ProviderError> {
    if envelope.code != 0 {
        return Err(ProviderError::Api { platform: Platform::Bilibili, message: envelope.message });
    }
    Ok(envelope.data.unwrap_or_default())
}

fn parse_room_info(body: &str) -> Result<RoomInfo, ProviderError> {
    let envelope: Envelope<RoomInfo> =
        serde_json::from_str(body).map_err(ProviderError::decode(Platform::Bilibili))?;
    unwrap_envelope(envelope)
}

fn parse_anchor_info(body: &str) -> Result<AnchorInfo, ProviderError> {
    let envelope: Envelope<AnchorData> =
        serde_json::from_str(body).map_err(ProviderError::decode(Platform::Bilibili))?;
    unwrap_envelope(envelope).map(|data| data.info)
}

#[async_trait]
impl StreamProvider for BilibiliProvider {
    fn platform(&self) -> Platform {
        Platform::Bilibili
    }

    async fn fetch_status(&self, channel_id: &str) -> Result<StreamStatus, ProviderError> {
        let url = format!("https://api.live.bilibili.com/room/v1/Room/get_info?room_id={}", channel_id);
        let body = self.transport.get_text(&url).await?;
        let room = parse_room_info(&body)?;

        // A missing anchor only costs us the name and avatar.
        let anchor = match self.anchor_info(room.room_id).await {
            Ok(anchor) => anchor,
            Err(e) => {
                debug!(channel_id, error = %e, "Bilibili anchor lookup failed, using channel id as name");
                AnchorInfo { uname: channel_id.to_string(), face: String::new() }
            }
        };

        Ok(StreamStatus {
            channel_id: channel_id.to_string(),
            name: anchor.uname,
            platform: Platform::Bilibili.to_string(),
            is_live: room.live_status == 1,
            title: room.title,
            category: room.area_name,
            viewer_count: room.online,
            thumbnail_url: room.keyframe,
            avatar_url: anchor.face,
            profile_url: format!("https://live.bilibili.com/{}", channel_id),
            observed_at: now_unix(),
        })
    }
}
