//! Merging of per-feed activity into one timeline.
//!
//! The records depend only on the set of copies received, so re-delivering
//! a batch or receiving feeds in another order yields the same records.
//! Only the relative order of records with equal timestamps follows arrival.
//!
//! A placeholder claimed by a record is held, not discarded, until the record
//! settles: if a later copy changes the survivor so it no longer matches, the
//! placeholder goes back to the timeline.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::activity::types::{CanonicalActivity, FeedKey, MergeReport, RawActivity, Replacement};
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct Pending {
    activity: RawActivity,
    seq: u64,
}

/// Canonical activity of one account.
#[derive(Debug, Default)]
pub struct Timeline {
    /// Every copy of every event, by id and source feed.
    copies: HashMap<String, BTreeMap<FeedKey, RawActivity>>,
    records: HashMap<String, CanonicalActivity>,
    first_seen: HashMap<String, u64>,
    /// Local placeholders in creation order.
    pending: Vec<Pending>,
    /// Confirmed id to the placeholder it replaced.
    claimed: HashMap<String, Pending>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Add a placeholder for a just-submitted transfer.
    pub fn add_local(&mut self, mut activity: RawActivity) {
        activity.is_local = true;
        let seq = self.bump_seq();
        debug!(id = %activity.id, token = %activity.token_slug, "Local activity added");
        self.pending.retain(|p| p.activity.id != activity.id);
        self.pending.push(Pending { activity, seq });
    }

    /// Merge one batch from `feed`. Malformed items are dropped and counted.
    pub fn apply_batch(&mut self, feed: &FeedKey, items: Vec<Value>) -> MergeReport {
        let mut report = MergeReport::default();
        let mut touched = Vec::new();
        let mut seen = HashSet::new();

        for item in items {
            let activity = match serde_json::from_value::<RawActivity>(item) {
                Ok(activity) if !activity.id.is_empty() => activity,
                Ok(_) => {
                    self.drop_item(feed, "empty id", &mut report);
                    continue;
                }
                Err(e) => {
                    self.drop_item(feed, &e.to_string(), &mut report);
                    continue;
                }
            };

            let id = activity.id.clone();
            if !self.first_seen.contains_key(&id) {
                let seq = self.bump_seq();
                self.first_seen.insert(id.clone(), seq);
            }
            self.copies
                .entry(id.clone())
                .or_default()
                .insert(feed.clone(), activity);
            if seen.insert(id.clone()) {
                touched.push(id);
            }
        }

        for id in &touched {
            let Some(record) = self.resolve(id) else {
                continue;
            };
            match self.records.insert(id.clone(), record) {
                None => report.inserted += 1,
                Some(previous) if previous != self.records[id] => report.updated += 1,
                Some(_) => {}
            }
        }

        for id in &touched {
            if let Some(pending_id) = self.release_stale_claim(id) {
                report.restored.push(pending_id);
            }
        }
        for id in &touched {
            if let Some(replacement) = self.replace_pending(id) {
                report.replaced.push(replacement);
            }
        }
        let restored = report.restored.clone();
        for pending_id in &restored {
            if let Some(replacement) = self.reclaim(pending_id) {
                report.replaced.push(replacement);
            }
        }
        if !report.replaced.is_empty() {
            metrics::record_activity_replaced(report.replaced.len());
        }

        debug!(
            feed = %feed,
            inserted = report.inserted,
            updated = report.updated,
            dropped = report.dropped,
            replaced = report.replaced.len(),
            restored = report.restored.len(),
            "Activity batch merged"
        );
        report
    }

    fn drop_item(&self, feed: &FeedKey, reason: &str, report: &mut MergeReport) {
        warn!(feed = %feed, reason, "Dropping malformed activity");
        metrics::record_activity_dropped(&feed.to_string());
        report.dropped += 1;
    }

    /// Collapse all copies of `id` into one record.
    fn resolve(&self, id: &str) -> Option<CanonicalActivity> {
        let copies = self.copies.get(id)?;
        // Token copies sort before the native one.
        let (source, survivor) = copies.iter().next()?;
        let mut activity = survivor.clone();

        if activity.fee == 0 {
            if let Some(native) = copies.get(&FeedKey::Native).filter(|n| n.fee > 0) {
                activity.fee = native.fee;
            }
        }

        Some(CanonicalActivity {
            activity,
            source: Some(source.clone()),
            seq: self.first_seen.get(id).copied().unwrap_or_default(),
        })
    }

    fn replace_pending(&mut self, confirmed_id: &str) -> Option<Replacement> {
        if self.claimed.contains_key(confirmed_id) {
            return None;
        }
        let record = self.records.get(confirmed_id)?;
        let arrived = self.first_seen.get(confirmed_id).copied()?;

        // Only records first seen after the placeholder was made can confirm it.
        let index = self
            .pending
            .iter()
            .position(|p| p.seq < arrived && p.activity.matches_pending(&record.activity))?;
        let pending = self.pending.remove(index);
        Some(self.claim(confirmed_id, pending))
    }

    /// Give a placeholder back when its confirmation re-resolved to something
    /// that no longer matches it.
    fn release_stale_claim(&mut self, confirmed_id: &str) -> Option<String> {
        let record = self.records.get(confirmed_id)?;
        let pending = self.claimed.get(confirmed_id)?;
        if pending.activity.matches_pending(&record.activity) {
            return None;
        }
        let pending = self.claimed.remove(confirmed_id)?;
        let pending_id = pending.activity.id.clone();
        debug!(pending_id = %pending_id, confirmed_id, "Local activity restored");

        let at = self.pending.partition_point(|p| p.seq < pending.seq);
        self.pending.insert(at, pending);
        Some(pending_id)
    }

    /// Offer a restored placeholder to every unclaimed record. The earliest
    /// eligible one wins.
    fn reclaim(&mut self, pending_id: &str) -> Option<Replacement> {
        let index = self.pending.iter().position(|p| p.activity.id == pending_id)?;
        let pending = &self.pending[index];
        let confirmed_id = self
            .records
            .iter()
            .filter(|(id, record)| {
                !self.claimed.contains_key(*id)
                    && self.first_seen.get(*id).is_some_and(|seen| *seen > pending.seq)
                    && pending.activity.matches_pending(&record.activity)
            })
            .min_by_key(|(id, _)| self.first_seen.get(*id).copied())
            .map(|(id, _)| id.clone())?;

        let pending = self.pending.remove(index);
        Some(self.claim(&confirmed_id, pending))
    }

    fn claim(&mut self, confirmed_id: &str, pending: Pending) -> Replacement {
        debug!(pending_id = %pending.activity.id, confirmed_id, "Local activity confirmed");
        let replacement = Replacement {
            pending_id: pending.activity.id.clone(),
            confirmed_id: confirmed_id.to_string(),
        };
        self.claimed.insert(confirmed_id.to_string(), pending);
        replacement
    }

    /// The timeline, newest first. Equal timestamps keep first-arrival order.
    pub fn entries(&self) -> Vec<CanonicalActivity> {
        let mut entries: Vec<CanonicalActivity> = self
            .records
            .values()
            .cloned()
            .chain(self.pending.iter().map(|p| CanonicalActivity {
                activity: p.activity.clone(),
                source: None,
                seq: p.seq,
            }))
            .collect();
        entries.sort_by(|a, b| {
            b.activity
                .timestamp
                .cmp(&a.activity.timestamp)
                .then(a.seq.cmp(&b.seq))
        });
        entries
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalActivity> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest and oldest confirmed timestamps carried by `feed`.
    pub fn feed_bounds(&self, feed: &FeedKey) -> Option<(u64, u64)> {
        self.copies
            .values()
            .filter_map(|copies| copies.get(feed))
            .map(|a| a.timestamp)
            .fold(None, |bounds, ts| match bounds {
                None => Some((ts, ts)),
                Some((newest, oldest)) => Some((newest.max(ts), oldest.min(ts))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::types::{Direction, NATIVE_SLUG};
    use serde_json::json;

    fn item(id: &str, ts: u64, fee: u64, slug: &str) -> Value {
        json!({
            "id": id,
            "timestamp": ts,
            "fee": fee,
            "direction": "outgoing",
            "amount": 10,
            "tokenSlug": slug,
        })
    }

    fn usdt() -> FeedKey {
        FeedKey::Token("usdt".into())
    }

    #[test]
    fn test_native_fee_fills_zero_token_fee() {
        let mut timeline = Timeline::new();
        timeline.apply_batch(&usdt(), vec![item("a:1", 1, 0, "usdt")]);
        timeline.apply_batch(&FeedKey::Native, vec![item("a:1", 1, 100, NATIVE_SLUG)]);

        let entries = timeline.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].activity.fee, 100);
        assert_eq!(entries[0].activity.token_slug, "usdt");
        assert_eq!(entries[0].source, Some(usdt()));
    }

    #[test]
    fn test_hidden_native_item_kept_without_token_copy() {
        let mut timeline = Timeline::new();
        let mut hidden = item("a:1", 1, 100, NATIVE_SLUG);
        hidden["shouldHide"] = json!(true);
        timeline.apply_batch(&FeedKey::Native, vec![hidden]);

        let entries = timeline.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].activity.token_slug, NATIVE_SLUG);
    }

    #[test]
    fn test_malformed_items_dropped() {
        let mut timeline = Timeline::new();
        let report = timeline.apply_batch(
            &FeedKey::Native,
            vec![
                json!({"id": "x"}),
                item("", 1, 0, NATIVE_SLUG),
                item("b:1", 2, 0, NATIVE_SLUG),
            ],
        );
        assert_eq!(report.dropped, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_redelivery_reports_no_change() {
        let mut timeline = Timeline::new();
        let batch = vec![item("a:1", 1, 5, NATIVE_SLUG)];
        assert_eq!(timeline.apply_batch(&FeedKey::Native, batch.clone()).inserted, 1);
        let again = timeline.apply_batch(&FeedKey::Native, batch);
        assert_eq!(again, MergeReport::default());
    }

    #[test]
    fn test_pending_replaced_by_matching_confirmation() {
        let mut timeline = Timeline::new();
        let local = RawActivity {
            id: "local:1".into(),
            timestamp: 50,
            kind: Default::default(),
            fee: 0,
            direction: Direction::Outgoing,
            amount: 10,
            involved_addresses: vec![],
            token_slug: "usdt".into(),
            should_hide: false,
            comment: None,
            is_local: false,
        };
        timeline.add_local(local);
        assert!(timeline.entries()[0].activity.is_local);

        // Native copy alone does not match: different slug.
        let report = timeline.apply_batch(&FeedKey::Native, vec![item("t:1", 60, 100, NATIVE_SLUG)]);
        assert!(report.replaced.is_empty());

        let report = timeline.apply_batch(&usdt(), vec![item("t:1", 60, 0, "usdt")]);
        assert_eq!(
            report.replaced,
            vec![Replacement {
                pending_id: "local:1".into(),
                confirmed_id: "t:1".into()
            }]
        );
        let entries = timeline.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].activity.is_local);
    }

    #[test]
    fn test_old_record_does_not_confirm_new_placeholder() {
        let mut timeline = Timeline::new();
        timeline.apply_batch(&FeedKey::Native, vec![item("old:1", 1, 5, NATIVE_SLUG)]);

        let local: RawActivity = serde_json::from_value(item("local:2", 9, 0, NATIVE_SLUG)).unwrap();
        timeline.add_local(local);

        let report = timeline.apply_batch(&FeedKey::Native, vec![item("old:1", 1, 5, NATIVE_SLUG)]);
        assert!(report.replaced.is_empty());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut timeline = Timeline::new();
        timeline.apply_batch(
            &FeedKey::Native,
            vec![item("b:1", 5, 0, NATIVE_SLUG), item("a:1", 5, 0, NATIVE_SLUG), item("c:1", 9, 0, NATIVE_SLUG)],
        );
        let ids: Vec<_> = timeline.entries().into_iter().map(|e| e.activity.id).collect();
        assert_eq!(ids, vec!["c:1", "b:1", "a:1"]);
    }

    #[test]
    fn test_repeated_id_in_batch_counts_once() {
        let mut timeline = Timeline::new();
        let batch: Vec<Value> = (0..500).map(|i| item("a:1", i, 5, NATIVE_SLUG)).collect();
        let report = timeline.apply_batch(&FeedKey::Native, batch);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 0);
        // The last copy in the batch wins.
        assert_eq!(timeline.get("a:1").unwrap().activity.timestamp, 499);
    }

    #[test]
    fn test_feed_bounds() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.feed_bounds(&FeedKey::Native), None);
        timeline.apply_batch(
            &FeedKey::Native,
            vec![item("a:1", 3, 0, NATIVE_SLUG), item("b:1", 8, 0, NATIVE_SLUG)],
        );
        assert_eq!(timeline.feed_bounds(&FeedKey::Native), Some((8, 3)));
        assert_eq!(timeline.feed_bounds(&usdt()), None);
    }
}
