//! Polling the indexer and feeding the merge engine.
//!
//! Every account has one native feed plus one feed per tracked token.
//! New items are polled per feed from that feed's newest known timestamp;
//! history is paged backwards on demand.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::activity::slice::{check_slice, ActivitySlice};
use crate::activity::store::ActivityStore;
use crate::activity::types::{FeedKey, MergeReport};
use crate::blockchain::client::{ActivityIndexer, ActivityQuery, RpcResult};
use crate::config::schema::{ActivityConfig, RetryConfig};
use crate::lifecycle::ShutdownSignal;
use crate::resilience::retries::{retry_with_backoff, RetryPolicy};

/// An account and the token feeds tracked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub account_id: String,
    pub token_slugs: Vec<String>,
}

impl SyncTarget {
    /// The native feed first, then each distinct token feed.
    pub fn feeds(&self) -> Vec<FeedKey> {
        let mut feeds = vec![FeedKey::Native];
        for slug in &self.token_slugs {
            let feed = FeedKey::for_slug(Some(slug));
            if !feeds.contains(&feed) {
                feeds.push(feed);
            }
        }
        feeds
    }
}

/// Result of one sync pass over an account.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub merged: Vec<(FeedKey, MergeReport)>,
    pub failed: Vec<FeedKey>,
}

pub struct ActivitySync {
    indexer: Arc<dyn ActivityIndexer>,
    store: Arc<ActivityStore>,
    config: ActivityConfig,
    retry: RetryPolicy,
}

impl ActivitySync {
    pub fn new(indexer: Arc<dyn ActivityIndexer>, store: Arc<ActivityStore>, config: ActivityConfig) -> Self {
        Self {
            indexer,
            store,
            config,
            retry: RetryPolicy::from(&RetryConfig::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<ActivityStore> {
        &self.store
    }

    async fn fetch(&self, query: ActivityQuery) -> RpcResult<ActivitySlice> {
        let page = retry_with_backoff(self.retry, "indexer_activity_slice", || {
            self.indexer.fetch_activity_slice(&query)
        })
        .await?;
        Ok(check_slice(page.items, query.limit, self.config.trace_trim_threshold))
    }

    /// Fetch everything newer than what each feed already has and merge it.
    ///
    /// A failing feed is reported and skipped; the others still merge.
    pub async fn sync_account(&self, target: &SyncTarget) -> SyncReport {
        let feeds = target.feeds();
        let fetches = feeds.iter().map(|feed| async move {
            let newest = self
                .store
                .feed_bounds(&target.account_id, feed)
                .await
                .map(|(newest, _)| newest);
            let query = ActivityQuery {
                account_id: target.account_id.clone(),
                token_slug: feed.token_slug().map(str::to_owned),
                from_timestamp: newest,
                to_timestamp: None,
                limit: self.config.slice_limit,
            };
            self.fetch(query).await
        });
        let results = join_all(fetches).await;

        let mut report = SyncReport::default();
        for (feed, result) in feeds.into_iter().zip(results) {
            match result {
                Ok(slice) => {
                    let merged = self.store.apply_batch(&target.account_id, &feed, slice.items).await;
                    report.merged.push((feed, merged));
                }
                Err(e) => {
                    warn!(account_id = %target.account_id, feed = %feed, error = %e, "Activity fetch failed");
                    report.failed.push(feed);
                }
            }
        }
        report
    }

    /// Load the page of `feed` older than `to_timestamp` (or the latest page)
    /// and merge it. Returns whether more history may exist.
    pub async fn fetch_past(&self, account_id: &str, feed: &FeedKey, to_timestamp: Option<u64>) -> RpcResult<bool> {
        let query = ActivityQuery {
            account_id: account_id.to_string(),
            token_slug: feed.token_slug().map(str::to_owned),
            from_timestamp: None,
            to_timestamp,
            limit: self.config.slice_limit,
        };
        let slice = self.fetch(query).await?;
        let report = self.store.apply_batch(account_id, feed, slice.items).await;
        debug!(
            account_id,
            feed = %feed,
            inserted = report.inserted,
            should_fetch_more = slice.should_fetch_more,
            "Past activity loaded"
        );
        Ok(slice.should_fetch_more)
    }

    /// Load the next older page of `feed` after what is already stored.
    pub async fn fetch_older(&self, account_id: &str, feed: &FeedKey) -> RpcResult<bool> {
        let oldest = self
            .store
            .feed_bounds(account_id, feed)
            .await
            .map(|(_, oldest)| oldest);
        self.fetch_past(account_id, feed, oldest).await
    }

    /// Poll all `targets` until shutdown is signalled. A pass already under
    /// way finishes first.
    pub async fn run(self: Arc<Self>, targets: Vec<SyncTarget>, mut shutdown: ShutdownSignal) {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        info!(
            accounts = targets.len(),
            interval_ms = self.config.poll_interval_ms,
            "Starting activity sync"
        );

        while !shutdown.is_triggered() {
            for target in &targets {
                let report = self.sync_account(target).await;
                if !report.failed.is_empty() {
                    debug!(account_id = %target.account_id, failed = report.failed.len(), "Sync pass incomplete");
                }
            }

            tokio::select! {
                _ = shutdown.triggered() => break,
                _ = sleep(interval) => {}
            }
        }
        info!("Activity sync stopped");
    }
}

impl std::fmt::Debug for ActivitySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivitySync")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish()
    }
}
