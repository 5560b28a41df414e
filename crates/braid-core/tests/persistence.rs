//! Persisting entries through the block store and reconstructing logs.
//!
//! These scenarios drive the full persist → fetch → rebuild path: every
//! appended entry lands in the store, a log header pins the DAG by its
//! heads, and reconstruction honors fetch length caps.

use std::sync::Arc;

use braid_core::{
    fetch_all, Entry, FetchOptions, Identity, Keystore, Log, LogOptions, MemoryStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture() -> (Arc<MemoryStore>, Arc<Keystore>, Identity) {
    let store = Arc::new(MemoryStore::new());
    let keystore = Arc::new(Keystore::new());
    let identity = keystore.create_identity("userA");
    (store, keystore, identity)
}

fn new_log(store: &Arc<MemoryStore>, keystore: &Arc<Keystore>, identity: &Identity) -> Log {
    Log::new(
        store.clone(),
        keystore.clone(),
        identity.clone(),
        LogOptions {
            id: Some("X".into()),
            ..LogOptions::default()
        },
    )
    .expect("new log")
}

fn payloads(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| String::from_utf8_lossy(&e.payload).into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Entry persistence
// ---------------------------------------------------------------------------

#[test]
fn log_with_one_entry_fetches_one() {
    let (store, keystore, identity) = fixture();
    let mut log = new_log(&store, &keystore, &identity);
    let entry = log.append(b"one", 1).unwrap();

    let fetched = fetch_all(store.as_ref(), &[entry.hash], FetchOptions::default());
    assert_eq!(fetched.len(), 1);
}

#[test]
fn log_with_two_entries_fetches_two() {
    let (store, keystore, identity) = fixture();
    let mut log = new_log(&store, &keystore, &identity);
    log.append(b"one", 1).unwrap();
    let entry = log.append(b"two", 1).unwrap();

    let fetched = fetch_all(store.as_ref(), &[entry.hash], FetchOptions::default());
    assert_eq!(fetched.len(), 2);
}

#[test]
fn fetch_loads_at_most_requested_length() {
    let (store, keystore, identity) = fixture();
    let mut log = new_log(&store, &keystore, &identity);
    log.append(b"one", 1).unwrap();
    let entry = log.append(b"two", 1).unwrap();

    let fetched = fetch_all(
        store.as_ref(),
        &[entry.hash],
        FetchOptions {
            length: Some(1),
            ..FetchOptions::default()
        },
    );
    assert_eq!(fetched.len(), 1);
}

#[test]
fn log_with_one_hundred_entries_fetches_all() {
    let (store, keystore, identity) = fixture();
    let mut log = new_log(&store, &keystore, &identity);

    let mut last = None;
    for i in 0..100 {
        last = Some(log.append(format!("hello{i}").as_bytes(), 1).unwrap());
    }

    let tip = last.unwrap().hash;
    let fetched = fetch_all(store.as_ref(), &[tip], FetchOptions::default());
    assert_eq!(fetched.len(), 100);
}

// ---------------------------------------------------------------------------
// Length-capped reconstruction
// ---------------------------------------------------------------------------

#[test]
fn load_only_42_entries_from_a_log_with_100() {
    let (store, keystore, identity) = fixture();
    let mut log1 = new_log(&store, &keystore, &identity);
    let mut log2 = new_log(&store, &keystore, &identity);

    for i in 0..100 {
        log1.append(format!("hello{i}").as_bytes(), 1).unwrap();
        if i % 10 == 0 {
            log2.append(format!("hi{i}").as_bytes(), 1).unwrap();
            log2.join(&log1, None).unwrap();
        }
    }
    log1.join(&log2, None).unwrap();

    let hash = log1.to_multihash().unwrap();
    let rebuilt = Log::from_multihash(
        store.clone(),
        keystore.clone(),
        identity.clone(),
        &hash,
        LogOptions::default(),
        FetchOptions {
            length: Some(42),
            ..FetchOptions::default()
        },
    )
    .unwrap();

    assert_eq!(rebuilt.len(), 42);
    // The heads seed the fetch, so the latest head always survives the cap.
    for head in log1.heads().unwrap() {
        assert!(rebuilt.has(&head.hash));
    }
}

#[test]
fn load_only_99_entries_from_a_log_with_100() {
    let (store, keystore, identity) = fixture();
    let mut log1 = new_log(&store, &keystore, &identity);
    let mut log2 = new_log(&store, &keystore, &identity);

    for i in 0..100 {
        log1.append(format!("hello{i}").as_bytes(), 1).unwrap();
        if i % 10 == 0 {
            log2.append(format!("hi{i}").as_bytes(), 1).unwrap();
            log2.join(&log1, None).unwrap();
        }
    }

    let hash = log2.to_multihash().unwrap();
    let rebuilt = Log::from_multihash(
        store.clone(),
        keystore.clone(),
        identity.clone(),
        &hash,
        LogOptions::default(),
        FetchOptions {
            length: Some(99),
            ..FetchOptions::default()
        },
    )
    .unwrap();

    assert_eq!(rebuilt.len(), 99);
}

#[test]
fn load_only_10_entries_from_interleaved_logs() {
    let (store, keystore, identity) = fixture();
    let mut log1 = new_log(&store, &keystore, &identity);
    let mut log2 = new_log(&store, &keystore, &identity);
    let mut log3 = new_log(&store, &keystore, &identity);

    for i in 0..100 {
        log1.append(format!("hello{i}").as_bytes(), 1).unwrap();
        if i % 10 == 0 {
            log2.append(format!("hi{i}").as_bytes(), 1).unwrap();
            log2.join(&log1, None).unwrap();
        }
        if i % 25 == 0 {
            log3.append(format!("--{i}").as_bytes(), 1).unwrap();
            log3.join(&log2, None).unwrap();
        }
    }
    log3.join(&log2, None).unwrap();

    let hash = log3.to_multihash().unwrap();
    let rebuilt = Log::from_multihash(
        store.clone(),
        keystore.clone(),
        identity.clone(),
        &hash,
        LogOptions::default(),
        FetchOptions {
            length: Some(10),
            ..FetchOptions::default()
        },
    )
    .unwrap();

    assert_eq!(rebuilt.len(), 10);
}

// ---------------------------------------------------------------------------
// Replica equivalence after joins
// ---------------------------------------------------------------------------

#[test]
fn late_replica_catches_up_through_joins() {
    let store = Arc::new(MemoryStore::new());
    let keystore = Arc::new(Keystore::new());
    let identities: Vec<Identity> = (0..4)
        .map(|i| keystore.create_identity(&format!("user{i}")))
        .collect();

    let mut log1 = new_log(&store, &keystore, &identities[0]);
    let mut log2 = new_log(&store, &keystore, &identities[1]);
    let mut log3 = new_log(&store, &keystore, &identities[2]);

    for i in 0..30 {
        log1.append(format!("hello{i}").as_bytes(), 1).unwrap();
        if i % 10 == 0 {
            log2.append(format!("hi{i}").as_bytes(), 1).unwrap();
            log2.join(&log1, None).unwrap();
        }
        if i % 25 == 0 {
            log3.append(format!("--{i}").as_bytes(), 1).unwrap();
            log3.join(&log2, None).unwrap();
        }
    }
    log3.join(&log2, None).unwrap();

    // A fourth replica that saw nothing catches up from log2 and log3.
    let mut log4 = new_log(&store, &keystore, &identities[3]);
    log4.join(&log2, None).unwrap();
    log4.join(&log3, None).unwrap();

    assert_eq!(
        payloads(&log3.values().unwrap()),
        payloads(&log4.values().unwrap())
    );
}
