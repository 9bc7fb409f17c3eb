//! Douyu provider — the betard room endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::*;

#[derive(Debug, Deserialize)]
struct BetardResponse {
    room: Room,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Room {
    /// 1 while broadcasting, 2 when offline.
    show_status: i64,
    owner_name: String,
    avatar_mid: String,
    room_name: String,
    room_pic: String,
    second_lvl_name: String,
    /// 1 when the room is replaying a recording.
    #[serde(rename = "videoLoop")]
    video_loop: i64,
    room_biz_all: RoomBiz,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoomBiz {
    hot: String,
}

pub struct DouyuProvider {
    transport: Arc<dyn Transport>,
}

impl DouyuProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn parse_room(body: &str) -> Result<Room, ProviderError> {
    let resp: BetardResponse = serde_json::from_str(body).map_err(ProviderError::decode(Platform::Douyu))?;
    Ok(resp.room)
}

#[async_trait]
impl StreamProvider for DouyuProvider {
    fn platform(&self) -> Platform {
        Platform::Douyu
    }

    async fn fetch_status(&self, channel_id: &str) -> Result<StreamStatus, ProviderError> {
        let url = format!("https://www.douyu.com/betard/{}", channel_id);
        let body = self.transport.get_text(&url).await?;
        let room = parse_room(&body)?;

        Ok(StreamStatus {
            channel_id: channel_id.to_string(),
            name: room.owner_name,
            platform: Platform::Douyu.to_string(),
            is_live: room.show_status == 1 && room.video_loop == 0,
            title: room.room_name,
            category: room.second_lvl_name,
            viewer_count: room.room_biz_all.hot.trim().parse().unwrap_or(0),
            thumbnail_url: room.room_pic,
            avatar_url: room.avatar_mid,
            profile_url: format!("https://www.douyu.com/{}", channel_id),
            observed_at: now_unix(),
        })
    }
}
