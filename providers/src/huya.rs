//! Huya provider — the LiveRoom cache endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::*;

#[derive(Debug, Deserialize)]
struct LiveRoomResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<LiveRoom>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LiveRoom {
    is_live: i64,
    room_name: String,
    nick_name: String,
    total_count: i64,
    room_pic: String,
    game_full_name: String,
}

pub struct HuyaProvider {
    transport: Arc<dyn Transport>,
}

impl HuyaProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn parse_live_room(body: &str) -> Result<LiveRoom, ProviderError> {
    let resp: LiveRoomResponse = serde_json::from_str(body).map_err(ProviderError::decode(Platform::Huya))?;
    if resp.code != 200 {
        return Err(ProviderError::Api { platform: Platform::Huya, message: resp.message });
    }
    resp.data
        .ok_or_else(|| ProviderError::Api { platform: Platform::Huya, message: "missing room data".to_string() })
}

#[async_trait]
impl StreamProvider for HuyaProvider {
    fn platform(&self) -> Platform {
        Platform::Huya
    }

    async fn fetch_status(&self, channel_id: &str) -> Result<StreamStatus, ProviderError> {
        let url = format!(
            "https://www.huya.com/cache.php?m=LiveRoom&do=getLiveRoomInfo&roomid={}",
            channel_id
        );
        let body = self.transport.get_text(&url).await?;
        let room = parse_live_room(&body)?;

        Ok(StreamStatus {
            channel_id: channel_id.to_string(),
            name: room.nick_name,
            platform: Platform::Huya.to_string(),
            is_live: room.is_live == 1,
            title: room.room_name,
            category: room.game_full_name,
            viewer_count: room.total_count,
            thumbnail_url: room.room_pic,
            avatar_url: String::new(),
            profile_url: format!("https://www.huya.com/{}", channel_id),
            observed_at: now_unix(),
        })
    }
}
