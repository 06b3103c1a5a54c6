//! Staleness reaper: keeps the cursor backlog fresh.
//!
//! Cursor entries are written on every pointer move and deleted when a
//! participant leaves cleanly. Entries left behind by dead connections are
//! purged here, once per join, while building the joiner's snapshot.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use igvroom_protocol::CURSOR_PREFIX;
use igvroom_store::{ListOptions, Store, StoreError};
use serde_json::Value;

use crate::RoomConfig;

/// Result of one reaper pass.
#[derive(Debug, Default, PartialEq)]
pub struct Reaped {
    /// Fresh cursor entries, most recent first.
    pub fresh: Vec<Value>,
    /// Number of stale entries deleted from the store.
    pub removed: usize,
}

/// Milliseconds since the Unix epoch, the unit of cursor timestamps.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Reads a cursor entry's `timestamp` field.
fn timestamp(entry: &Value) -> Option<u64> {
    let ts = entry.get("timestamp")?;
    ts.as_u64().or_else(|| ts.as_f64().map(|f| f.max(0.0) as u64))
}

/// `true` if the entry has no timestamp or is older than `ttl`.
pub fn is_stale(entry: &Value, now_ms: u64, ttl: Duration) -> bool {
    match timestamp(entry) {
        Some(ts) => u128::from(now_ms.saturating_sub(ts)) > ttl.as_millis(),
        None => true,
    }
}

/// Lists the newest cursor entries, deletes the stale ones in a single
/// batch, and returns the rest.
pub async fn reap_cursors<S: Store>(
    store: &S,
    config: &RoomConfig,
    now_ms: u64,
) -> Result<Reaped, StoreError> {
    let entries = store
        .list(
            ListOptions::prefix(CURSOR_PREFIX)
                .reverse()
                .limit(config.cursor_backlog_limit),
        )
        .await?;

    let mut stale = Vec::new();
    let mut fresh = Vec::new();
    for (key, value) in entries {
        if is_stale(&value, now_ms, config.cursor_ttl) {
            stale.push(key);
        } else {
            fresh.push(value);
        }
    }

    let removed = if stale.is_empty() {
        0
    } else {
        let removed = store.delete(&stale).await?;
        tracing::debug!(removed, "reaped stale cursors");
        removed
    };

    fresh.sort_by_key(|entry| std::cmp::Reverse(timestamp(entry)));
    Ok(Reaped { fresh, removed })
}

#[cfg(test)]
mod tests {
    use igvroom_store::MemoryStore;
    use serde_json::json;

    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn entry(name: &str, age_ms: u64) -> Value {
        json!({ "name": name, "timestamp": NOW - age_ms, "cursor": { "x": 1, "y": 1 } })
    }

    #[test]
    fn test_staleness_threshold() {
        let ttl = Duration::from_secs(100);
        assert!(!is_stale(&entry("a", 99_999), NOW, ttl));
        assert!(!is_stale(&entry("a", 100_000), NOW, ttl));
        assert!(is_stale(&entry("a", 100_001), NOW, ttl));
        assert!(is_stale(&json!({ "name": "a" }), NOW, ttl));
    }

    #[test]
    fn test_future_timestamps_are_fresh() {
        assert!(!is_stale(&entry("a", 0), NOW - 5, Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_reap_deletes_stale_and_orders_fresh_newest_first() {
        let store = MemoryStore::new();
        store.put("cursor:alice", entry("alice", 5_000)).await.unwrap();
        store.put("cursor:bob", entry("bob", 200_000)).await.unwrap();
        store.put("cursor:carol", entry("carol", 1_000)).await.unwrap();
        store.put("cursor:dave", json!({ "name": "dave" })).await.unwrap();
        store.put("setting:locus", json!("chr1")).await.unwrap();

        let reaped = reap_cursors(&store, &RoomConfig::default(), NOW).await.unwrap();

        assert_eq!(reaped.removed, 2);
        let names: Vec<&str> = reaped
            .fresh
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["carol", "alice"]);
        assert_eq!(store.get("cursor:bob").await.unwrap(), None);
        assert_eq!(store.get("cursor:dave").await.unwrap(), None);
        assert!(store.get("setting:locus").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reap_respects_backlog_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .put(&format!("cursor:user{i}"), entry(&format!("user{i}"), 10))
                .await
                .unwrap();
        }
        let config = RoomConfig {
            cursor_backlog_limit: 3,
            ..RoomConfig::default()
        };
        let reaped = reap_cursors(&store, &config, NOW).await.unwrap();
        assert_eq!(reaped.fresh.len(), 3);
        assert_eq!(reaped.removed, 0);
    }
}
