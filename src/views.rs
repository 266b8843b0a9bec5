//! Once-per-day view counting keyed on (video, viewer).
//!
//! A short-lived marker in the cache store remembers that a viewer was already
//! counted. Best effort only: two simultaneous requests from the same viewer can
//! both miss the marker and both increment.

use async_trait::async_trait;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cache::ResponseCache;
use crate::invalidation::CacheEvent;
use crate::observability;
use shared::{AppError, Result};

/// Durable view counter in the primary database
#[async_trait]
pub trait ViewCounter: Send + Sync {
    /// Increment and return the new total
    async fn increment_views(&self, video_id: &str) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewOutcome {
    Added { views: u64 },
    NotAdded,
}

#[derive(Clone)]
pub struct ViewTracker {
    cache: ResponseCache,
    counter: Arc<dyn ViewCounter>,
}

impl ViewTracker {
    pub fn new(cache: ResponseCache, counter: Arc<dyn ViewCounter>) -> Self {
        Self { cache, counter }
    }

    pub async fn record_view(&self, video_id: &str, viewer: &str) -> Result<ViewOutcome> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(AppError::validation("video id must not be empty"));
        }
        let viewer = normalize_viewer(viewer)
            .ok_or_else(|| AppError::validation("viewer must not be empty"))?;

        let marker = self.cache.keys().view_marker(video_id, &viewer);
        let already_counted = match self.cache.marker_present(&marker).await {
            Ok(present) => present,
            Err(e) => {
                self.cache.absorb("get", &marker, &e);
                false
            }
        };

        if already_counted {
            debug!(video_id, viewer = %viewer, "View already counted in this window");
            observability::record_view(false);
            return Ok(ViewOutcome::NotAdded);
        }

        let views = self.counter.increment_views(video_id).await.map_err(|e| {
            error!(video_id, error = %e, "❌ Failed to increment view count");
            AppError::Generic(e)
        })?;

        if let Err(e) = self.cache.put_marker(&marker).await {
            self.cache.absorb("set", &marker, &e);
        }
        self.cache
            .apply(&CacheEvent::VideoViewed {
                video_id: video_id.to_string(),
            })
            .await?;

        observability::record_view(true);
        info!(video_id, viewer = %viewer, views, "👁️ View recorded");
        Ok(ViewOutcome::Added { views })
    }
}

/// Canonical textual form for IP viewers; anything else is only trimmed.
fn normalize_viewer(viewer: &str) -> Option<String> {
    let viewer = viewer.trim();
    if viewer.is_empty() {
        return None;
    }
    match viewer.parse::<IpAddr>() {
        Ok(ip) => Some(ip.to_canonical().to_string()),
        Err(_) => Some(viewer.to_string()),
    }
}
