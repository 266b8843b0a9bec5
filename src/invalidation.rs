//! Which cache entries each write makes stale.

use serde_json::{json, Value};

use crate::cache_key::CacheResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// The single entry built from exactly these params
    Key,
    /// Every entry of the resource that starts with these params
    Related,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invalidation {
    pub resource: CacheResource,
    pub params: Vec<Value>,
    pub scope: InvalidationScope,
}

impl Invalidation {
    pub fn key(resource: CacheResource, params: Vec<Value>) -> Self {
        Self {
            resource,
            params,
            scope: InvalidationScope::Key,
        }
    }

    pub fn related(resource: CacheResource, params: Vec<Value>) -> Self {
        Self {
            resource,
            params,
            scope: InvalidationScope::Related,
        }
    }
}

/// A completed write against the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    VideoPublished { owner_id: String },
    VideoUpdated { video_id: String },
    VideoDeleted { video_id: String },
    VideoViewed { video_id: String },
    VideoLikeToggled { video_id: String },
    VideoDislikeToggled { video_id: String },
    PlaylistCreated { owner_id: String },
    PlaylistUpdated { playlist_id: String, owner_id: String },
    PlaylistsDeleted { playlist_ids: Vec<String>, owner_id: String },
    WatchLaterChanged { user_id: String },
    SubscriptionToggled { channel_id: String },
    NotificationsChanged { user_id: String },
    LoginRecorded { user_id: String },
}

/// Resources whose responses embed video fields (title, thumbnail, views).
/// Which entries hold a given video is unknown, so the whole resource goes.
const VIDEO_EMBEDDING: [CacheResource; 4] = [
    CacheResource::Playlist,
    CacheResource::UserPlaylist,
    CacheResource::UserCollection,
    CacheResource::WatchLater,
];

/// Resources whose responses embed the playlist owner's subscriber count.
const OWNER_EMBEDDING: [CacheResource; 3] = [
    CacheResource::Playlist,
    CacheResource::UserPlaylist,
    CacheResource::UserCollection,
];

fn flush_all(resources: &[CacheResource]) -> impl Iterator<Item = Invalidation> + '_ {
    resources
        .iter()
        .map(|resource| Invalidation::related(*resource, vec![]))
}

impl CacheEvent {
    pub fn invalidations(&self) -> Vec<Invalidation> {
        use CacheResource::*;

        match self {
            CacheEvent::VideoPublished { .. } => vec![Invalidation::related(AllVideos, vec![])],
            CacheEvent::VideoUpdated { video_id } | CacheEvent::VideoDeleted { video_id } => [
                Invalidation::related(Video, vec![json!(video_id)]),
                Invalidation::related(AllVideos, vec![]),
            ]
            .into_iter()
            .chain(flush_all(&VIDEO_EMBEDDING))
            .collect(),
            CacheEvent::VideoViewed { video_id } => {
                std::iter::once(Invalidation::related(Video, vec![json!(video_id)]))
                    .chain(flush_all(&VIDEO_EMBEDDING))
                    .collect()
            }
            CacheEvent::VideoLikeToggled { video_id } => vec![
                Invalidation::related(Video, vec![json!(video_id)]),
                Invalidation::key(VideoLikes, vec![json!(video_id)]),
            ],
            CacheEvent::VideoDislikeToggled { video_id } => vec![
                Invalidation::related(Video, vec![json!(video_id)]),
                Invalidation::key(VideoDislikes, vec![json!(video_id)]),
            ],
            CacheEvent::PlaylistCreated { owner_id } => {
                vec![Invalidation::related(UserPlaylist, vec![json!(owner_id)])]
            }
            CacheEvent::PlaylistUpdated { playlist_id, owner_id } => vec![
                Invalidation::key(Playlist, vec![json!(playlist_id)]),
                Invalidation::related(UserPlaylist, vec![json!(owner_id)]),
                Invalidation::related(UserCollection, vec![json!(owner_id)]),
            ],
            CacheEvent::PlaylistsDeleted { playlist_ids, owner_id } => playlist_ids
                .iter()
                .map(|id| Invalidation::key(Playlist, vec![json!(id)]))
                .chain([
                    Invalidation::related(UserPlaylist, vec![json!(owner_id)]),
                    Invalidation::related(UserCollection, vec![json!(owner_id)]),
                ])
                .collect(),
            CacheEvent::WatchLaterChanged { user_id } => {
                vec![Invalidation::key(WatchLater, vec![json!(user_id)])]
            }
            CacheEvent::SubscriptionToggled { channel_id } => {
                std::iter::once(Invalidation::key(Subscribers, vec![json!(channel_id)]))
                    .chain(flush_all(&OWNER_EMBEDDING))
                    .collect()
            }
            CacheEvent::NotificationsChanged { user_id } => {
                vec![Invalidation::related(Notifications, vec![json!(user_id)])]
            }
            CacheEvent::LoginRecorded { user_id } => {
                vec![Invalidation::related(LoginHistory, vec![json!(user_id)])]
            }
        }
    }
}
