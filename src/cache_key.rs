//! Cache key generation utilities
//!
//! Keys have the shape `<namespace>:<resource>:<p1>:<p2>:...` where every
//! parameter is written as canonical JSON (object keys sorted at every depth).
//! Two requests whose query objects differ only in field order therefore share
//! a key, while `"1"` and `1` stay distinct. A call without parameters yields
//! `<namespace>:<resource>:` with an empty segment, which no JSON value produces.

use serde_json::{Map, Value};
use std::fmt;

use crate::cache::CacheError;


/// Known response-cache resource tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResource {
    Video,
    AllVideos,
    VideoLikes,
    VideoDislikes,
    Playlist,
    UserPlaylist,
    UserCollection,
    WatchLater,
    Subscribers,
    Notifications,
    LoginHistory,
}

impl CacheResource {
    pub const ALL: [CacheResource; 11] = [
        CacheResource::Video,
        CacheResource::AllVideos,
        CacheResource::VideoLikes,
        CacheResource::VideoDislikes,
        CacheResource::Playlist,
        CacheResource::UserPlaylist,
        CacheResource::UserCollection,
        CacheResource::WatchLater,
        CacheResource::Subscribers,
        CacheResource::Notifications,
        CacheResource::LoginHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheResource::Video => "video",
            CacheResource::AllVideos => "all-videos",
            CacheResource::VideoLikes => "video-likes",
            CacheResource::VideoDislikes => "video-dislikes",
            CacheResource::Playlist => "playlist",
            CacheResource::UserPlaylist => "user-playlist",
            CacheResource::UserCollection => "user-collection",
            CacheResource::WatchLater => "watchLater",
            CacheResource::Subscribers => "subscribers",
            CacheResource::Notifications => "notifications",
            CacheResource::LoginHistory => "login-history",
        }
    }

    /// Known resource for `tag`, if any
    pub fn from_tag(tag: &str) -> Option<Self> {
        CacheResource::ALL.into_iter().find(|resource| resource.as_str() == tag)
    }
}

impl AsRef<str> for CacheResource {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully generated response-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    resource: String,
}

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Resource tag the key was generated for (used as a metrics label)
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn into_string(self) -> String {
        self.key
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Builds keys, prefixes and patterns scoped to one namespace.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    namespace: String,
}

impl KeyGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Generate the key for `resource` and `params`.
    ///
    /// Fails only when the resource tag is unusable, which is a caller defect.
    pub fn generate(&self, resource: impl AsRef<str>, params: &[Value]) -> Result<CacheKey, CacheError> {
        let resource = validate_resource(resource.as_ref())?;
        Ok(CacheKey {
            key: format!("{}:{}:{}", self.namespace, resource, serialize_params(params)),
            resource: resource.to_string(),
        })
    }

    /// Glob patterns covering every key of `resource` whose leading params equal `params`.
    ///
    /// With no params a single `<ns>:<resource>:*` pattern is enough. With params
    /// the exact key is returned alongside the `...:*` pattern so entries that carry
    /// exactly those params are covered as well.
    pub fn related_patterns(&self, resource: impl AsRef<str>, params: &[Value]) -> Result<Vec<String>, CacheError> {
        let resource = validate_resource(resource.as_ref())?;
        let base = format!("{}:{}:", escape_glob(&self.namespace), resource);

        if params.is_empty() {
            return Ok(vec![format!("{}*", base)]);
        }

        let scoped = format!("{}{}", base, escape_glob(&serialize_params(params)));
        Ok(vec![scoped.clone(), format!("{}:*", scoped)])
    }

    /// Marker key used by view deduplication; lives outside the response namespace.
    ///
    /// Both parts are JSON strings, so a viewer containing `:` (IPv6) cannot alias another pair.
    pub fn view_marker(&self, video_id: &str, viewer: &str) -> String {
        format!(
            "{}-views:{}:{}",
            self.namespace,
            Value::from(video_id),
            Value::from(viewer)
        )
    }
}

fn validate_resource(resource: &str) -> Result<&str, CacheError> {
    let trimmed = resource.trim();
    if trimmed.is_empty() {
        return Err(CacheError::InvalidResource {
            resource: resource.to_string(),
            reason: "resource tag must not be empty",
        });
    }
    if trimmed.contains(':') || trimmed.chars().any(is_glob_meta) {
        return Err(CacheError::InvalidResource {
            resource: resource.to_string(),
            reason: "resource tag must not contain ':' or glob metacharacters",
        });
    }
    Ok(trimmed)
}

fn serialize_params(params: &[Value]) -> String {
    params
        .iter()
        .map(|param| canonicalize(param).to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Rebuild `value` with object keys sorted at every level.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn is_glob_meta(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '\\')
}

/// Escape Redis glob metacharacters so `input` matches literally.
pub fn escape_glob(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if is_glob_meta(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
