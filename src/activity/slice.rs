//! Page checks for activity slices fetched from the indexer.

use serde_json::Value;

use crate::activity::types::trace_id;

/// A checked page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySlice {
    pub items: Vec<Value>,
    /// The page was full, so older items may exist.
    pub should_fetch_more: bool,
}

fn item_trace(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str).map(trace_id)
}

/// Check a page fetched with `limit`.
///
/// A full page may end in the middle of a trace. That trailing trace is cut
/// so the next page loads it whole, unless `max_trim` or more items would go
/// or nothing would be left.
pub fn check_slice(items: Vec<Value>, limit: usize, max_trim: usize) -> ActivitySlice {
    if limit == 0 || items.len() != limit {
        return ActivitySlice {
            items,
            should_fetch_more: false,
        };
    }

    ActivitySlice {
        items: trim_last_trace(items, max_trim),
        should_fetch_more: true,
    }
}

fn trim_last_trace(items: Vec<Value>, max_trim: usize) -> Vec<Value> {
    let Some(last) = items.last().and_then(item_trace).map(str::to_owned) else {
        return items;
    };
    let kept = items
        .iter()
        .filter(|item| item_trace(item) != Some(last.as_str()))
        .count();
    if kept == 0 || items.len() - kept >= max_trim {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item_trace(item) != Some(last.as_str()))
        .collect()
}
