use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tracing::debug;

use super::{Candle, SeriesKey};

// ---------------------------------------------------------------------------
// CandleCache -- thread-safe bounded LRU keyed by the exact fetch arguments
// ---------------------------------------------------------------------------

/// Thread-safe LRU cache for fetched price series.
///
/// Keys are the exact `(ticker, start, end, interval)` tuple; a repeated
/// identical request within the process lifetime is served from here without
/// touching the provider.  Capacity is fixed; inserting past it evicts the
/// least-recently-used entry.  A `get` hit counts as use and protects the
/// entry from eviction.
pub struct CandleCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    map: HashMap<SeriesKey, Vec<Candle>>,
    /// Recency queue: front = least recently used, back = most recent.
    order: VecDeque<SeriesKey>,
}

impl CandleCache {
    /// Create a cache retaining at most `capacity` series.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::with_capacity(capacity + 1),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Look up a series, promoting the entry to most-recently-used on a hit.
    pub fn get(&self, key: &SeriesKey) -> Option<Vec<Candle>> {
        let mut inner = self.inner.write();
        if !inner.map.contains_key(key) {
            return None;
        }
        Self::promote(&mut inner.order, key);
        let hit = inner.map.get(key).cloned();
        debug!(key = %key, "candle cache hit");
        hit
    }

    /// Insert (or replace) a series, evicting the LRU entry past capacity.
    pub fn insert(&self, key: SeriesKey, candles: Vec<Candle>) {
        let mut inner = self.inner.write();
        if inner.map.insert(key.clone(), candles).is_some() {
            Self::promote(&mut inner.order, &key);
        } else {
            inner.order.push_back(key);
        }
        while inner.map.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.map.remove(&evicted);
                debug!(key = %evicted, "candle cache evicted LRU entry");
            } else {
                break;
            }
        }
    }

    /// Number of cached series.
    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move `key` to the most-recently-used position.
    fn promote(order: &mut VecDeque<SeriesKey>, key: &SeriesKey) {
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Interval;
    use chrono::NaiveDate;

    fn key(ticker: &str) -> SeriesKey {
        SeriesKey {
            ticker: ticker.to_string(),
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            interval: Interval::Daily,
        }
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(i as i64 * 60, 1.0, 2.0, 0.5, 1.5, 100.0))
            .collect()
    }

    #[test]
    fn miss_then_hit() {
        let cache = CandleCache::new(4);
        assert!(cache.get(&key("AAPL")).is_none());

        cache.insert(key("AAPL"), candles(3));
        let hit = cache.get(&key("AAPL")).unwrap();
        assert_eq!(hit.len(), 3);
    }

    #[test]
    fn identical_key_replaces_entry() {
        let cache = CandleCache::new(4);
        cache.insert(key("AAPL"), candles(3));
        cache.insert(key("AAPL"), candles(5));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("AAPL")).unwrap().len(), 5);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = CandleCache::new(2);
        cache.insert(key("AAPL"), candles(1));
        cache.insert(key("MSFT"), candles(2));
        cache.insert(key("TSLA"), candles(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("AAPL")).is_none());
        assert!(cache.get(&key("MSFT")).is_some());
        assert!(cache.get(&key("TSLA")).is_some());
    }

    #[test]
    fn get_protects_entry_from_eviction() {
        let cache = CandleCache::new(2);
        cache.insert(key("AAPL"), candles(1));
        cache.insert(key("MSFT"), candles(2));

        // Touch AAPL so MSFT becomes the LRU entry.
        assert!(cache.get(&key("AAPL")).is_some());
        cache.insert(key("TSLA"), candles(3));

        assert!(cache.get(&key("AAPL")).is_some());
        assert!(cache.get(&key("MSFT")).is_none());
    }

    #[test]
    fn empty_series_is_cacheable() {
        // Empty provider results are valid data, not errors; cache them too.
        let cache = CandleCache::new(2);
        cache.insert(key("UNKNOWN"), Vec::new());
        assert_eq!(cache.get(&key("UNKNOWN")).unwrap().len(), 0);
    }
}
