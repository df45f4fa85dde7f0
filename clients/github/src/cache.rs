use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Size bounded map whose entries expire `ttl` after insertion.
///
/// Expiry is lazy: stale entries are never returned but are only dropped on the next `put`.
/// On overflow the least recently *inserted* entry goes first, reads do not refresh it.
pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<K, Entry<V>>,
    insertion_order: VecDeque<K>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        TtlCache {
            ttl,
            max_entries,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| &entry.value)
    }

    pub fn put(&mut self, key: K, value: V) {
        let now = Instant::now();
        self.purge_expired(now);
        if self.entries.contains_key(&key) {
            self.insertion_order.retain(|k| k != &key);
        }
        self.insertion_order.push_back(key.clone());
        self.entries.insert(key, Entry { value, inserted_at: now });
        while self.entries.len() > self.max_entries {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Live entries only.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Insertion order is expiry order, so stale entries sit at the front.
    fn purge_expired(&mut self, now: Instant) {
        while let Some(oldest) = self.insertion_order.front() {
            let stale = self
                .entries
                .get(oldest)
                .map_or(true, |entry| entry.is_expired(self.ttl, now));
            if !stale {
                break;
            }
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[test]
fn put_then_get_test() {
    let mut cache = TtlCache::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES);
    cache.put("octo", vec![1, 2, 3]);
    assert_eq!(cache.get(&"octo"), Some(&vec![1, 2, 3]));
    assert_eq!(cache.get(&"other"), None);

    cache.put("octo", vec![4]);
    assert_eq!(cache.get(&"octo"), Some(&vec![4]), "Put should overwrite");
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_absent_test() {
    let mut cache = TtlCache::new(Duration::from_secs(300), DEFAULT_MAX_ENTRIES);
    cache.put("octo", 1);

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(cache.get(&"octo"), Some(&1));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get(&"octo"), None, "Entry should expire without an eviction pass");
    assert!(cache.is_empty());
}

#[test]
fn capacity_evicts_first_inserted_test() {
    let mut cache = TtlCache::new(DEFAULT_TTL, 3);
    for key in ["a", "b", "c"] {
        cache.put(key, key.len());
    }
    // Reading does not protect "a" from eviction.
    assert!(cache.get(&"a").is_some());
    cache.put("d", 1);

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get(&"a"), None);
    assert!(cache.get(&"b").is_some());
    assert!(cache.get(&"d").is_some());
}

#[test]
fn overwrite_refreshes_insertion_order_test() {
    let mut cache = TtlCache::new(DEFAULT_TTL, 2);
    cache.put("a", 1);
    cache.put("b", 2);
    cache.put("a", 3);
    cache.put("c", 4);

    assert_eq!(cache.get(&"b"), None);
    assert_eq!(cache.get(&"a"), Some(&3));
    assert_eq!(cache.get(&"c"), Some(&4));
}
