//! Per-account timelines.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::activity::merge::Timeline;
use crate::activity::types::{CanonicalActivity, FeedKey, MergeReport, RawActivity};

/// Timelines of all accounts.
///
/// Each account has a single writer at a time; accounts never block each
/// other.
#[derive(Debug, Default)]
pub struct ActivityStore {
    timelines: DashMap<String, Arc<Mutex<Timeline>>>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn timeline(&self, account_id: &str) -> Arc<Mutex<Timeline>> {
        if let Some(timeline) = self.timelines.get(account_id) {
            return timeline.clone();
        }
        self.timelines
            .entry(account_id.to_string())
            .or_default()
            .clone()
    }

    pub async fn apply_batch(&self, account_id: &str, feed: &FeedKey, items: Vec<Value>) -> MergeReport {
        let timeline = self.timeline(account_id);
        let mut timeline = timeline.lock().await;
        timeline.apply_batch(feed, items)
    }

    pub async fn add_local(&self, account_id: &str, activity: RawActivity) {
        let timeline = self.timeline(account_id);
        timeline.lock().await.add_local(activity);
    }

    /// Current timeline of `account_id`, newest first.
    pub async fn entries(&self, account_id: &str) -> Vec<CanonicalActivity> {
        let Some(timeline) = self.timelines.get(account_id).map(|t| t.clone()) else {
            return Vec::new();
        };
        let timeline = timeline.lock().await;
        timeline.entries()
    }

    pub async fn feed_bounds(&self, account_id: &str, feed: &FeedKey) -> Option<(u64, u64)> {
        let timeline = self.timelines.get(account_id).map(|t| t.clone())?;
        let timeline = timeline.lock().await;
        timeline.feed_bounds(feed)
    }

    pub fn remove_account(&self, account_id: &str) {
        self.timelines.remove(account_id);
    }
}
