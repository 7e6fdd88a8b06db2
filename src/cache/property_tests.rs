//! Property-Based Tests for the Cache Store
//!
//! Uses proptest to check expiry, prefix and statistics behaviour over
//! arbitrary operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStore};

// == Strategies ==
/// Generates valid cache keys from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "(user|team|order):[0-9]{1,2}".prop_map(|s| s)
}

/// Generates non-null JSON payloads
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,32}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        (any::<u32>(), "[a-z]{1,8}").prop_map(|(id, name)| json!({"id": id, "name": name})),
    ]
}

/// Generates a sequence of store operations
#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| StoreOp::Set { key, value }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
        key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store agrees with a plain map model for entries without a TTL,
    // and hit/miss counters match the reads performed.
    #[test]
    fn prop_no_ttl_store_matches_model(ops in prop::collection::vec(store_op_strategy(), 1..80)) {
        let store = CacheStore::new();
        let mut model: HashMap<String, Value> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    store.set(key.clone(), value.clone()).unwrap();
                    model.insert(key, value);
                }
                StoreOp::Get { key } => {
                    let got = store.get(&key);
                    prop_assert_eq!(&got, &model.get(&key).cloned());
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                StoreOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key), model.remove(&key).is_some());
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, model.len());
    }

    // An entry is live strictly before its deadline and expired at or after it.
    #[test]
    fn prop_expiry_boundary(ttl_ms in 0u64..10_000_000, offset in 0u64..10_000_000) {
        let created = 1_700_000_000_000u64;
        let entry = CacheEntry::created_at(json!(1), Some(Duration::from_millis(ttl_ms)), created);
        let deadline = created + ttl_ms;

        prop_assert!(entry.is_expired_at(deadline + offset));
        if offset > 0 && offset <= ttl_ms {
            prop_assert!(!entry.is_expired_at(deadline - offset));
        }
    }

    // Entries without a TTL never expire, whatever the clock says.
    #[test]
    fn prop_no_ttl_never_expires(now in any::<u64>()) {
        let entry = CacheEntry::created_at(json!("forever"), None, current_timestamp_ms());
        prop_assert!(!entry.is_expired_at(now));
        prop_assert_eq!(entry.expires_at, None);
    }

    // Prefix scans return exactly the live keys starting with the prefix.
    #[test]
    fn prop_prefix_scan_matches_filter(
        keys in prop::collection::hash_set(key_strategy(), 0..40),
        prefix in "(user|team|order):[0-9]?"
    ) {
        let store = CacheStore::new();
        for key in &keys {
            store.set(key.clone(), json!(true)).unwrap();
        }

        let expected: HashSet<String> = keys
            .iter()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        prop_assert_eq!(store.keys_with_prefix(&prefix), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Concurrent writers on disjoint keys never lose a write.
    #[test]
    fn prop_concurrent_disjoint_writes(threads in 2usize..8, per_thread in 1usize..50) {
        let store = Arc::new(CacheStore::new());

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        store.set(format!("t{t}:{i}"), json!(i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        prop_assert_eq!(store.len(), threads * per_thread);
        for t in 0..threads {
            prop_assert_eq!(store.keys_with_prefix(&format!("t{t}:")).len(), per_thread);
        }
    }
}

// Wall-clock expiry through the public API, kept out of the proptest loop.
#[test]
fn test_ttl_entry_expires_on_wall_clock() {
    let store = CacheStore::new();
    store
        .set_with_expiry("short", json!(1), Some(Duration::from_millis(30)))
        .unwrap();
    assert_eq!(store.get("short"), Some(json!(1)));

    thread::sleep(Duration::from_millis(50));

    assert_eq!(store.get("short"), None);
    assert!(!store.exists("short"));
}
