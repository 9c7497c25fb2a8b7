//! Outbox Store Integration Tests
//!
//! Tests for ID assignment, persistence across reopen, and acknowledgement.

use std::sync::Arc;

use tempfile::TempDir;
use workflow_outbox::core::{record_to_outbox_event_data, JsonlOutbox, OutboxStore};
use workflow_outbox::domain::{OutboxEventData, RunState, WireRecord};

fn transition(foreign_id: &str, status: i32) -> OutboxEventData {
    let record = WireRecord::new("onboarding", "rec-1", foreign_id, status, "run-1", RunState::Running);
    record_to_outbox_event_data(&record, RunState::Initiated).unwrap()
}

#[tokio::test]
async fn test_insert_and_list_in_id_order() {
    let temp = TempDir::new().unwrap();
    let store = JsonlOutbox::new(temp.path().join("outbox.jsonl"));

    for i in 0..5 {
        store.insert(transition(&format!("cust-{}", i), i)).await.unwrap();
    }

    let events = store.list(10).await.unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.id, i as i64 + 1);
        assert_eq!(event.decode().unwrap().foreign_id, format!("cust-{}", i));
    }

    assert_eq!(store.list(2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("outbox.jsonl");

    let stored = {
        let store = JsonlOutbox::new(path.clone());
        store.insert(transition("cust-1", 3)).await.unwrap()
    };

    let reopened = JsonlOutbox::new(path);
    let loaded = reopened.get(stored.id).await.unwrap().unwrap();
    assert_eq!(loaded, stored);

    let next = reopened.insert(transition("cust-2", 4)).await.unwrap();
    assert_eq!(next.id, stored.id + 1);
}

#[tokio::test]
async fn test_delete_removes_event_and_never_reuses_id() {
    let temp = TempDir::new().unwrap();
    let store = JsonlOutbox::new(temp.path().join("outbox.jsonl"));

    let first = store.insert(transition("cust-1", 1)).await.unwrap();
    let second = store.insert(transition("cust-1", 2)).await.unwrap();

    assert!(store.delete(second.id).await.unwrap());
    assert!(!store.delete(second.id).await.unwrap());
    assert!(store.get(second.id).await.unwrap().is_none());

    let remaining = store.list(10).await.unwrap();
    assert_eq!(remaining, vec![first]);

    let third = store.insert(transition("cust-1", 3)).await.unwrap();
    assert_eq!(third.id, 3);
}

#[tokio::test]
async fn test_concurrent_inserts_get_unique_ids() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(JsonlOutbox::new(temp.path().join("outbox.jsonl")));

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.insert(transition(&format!("cust-{}", i), i)).await.unwrap().id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();

    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_store_usable_as_trait_object() {
    let temp = TempDir::new().unwrap();
    let store: Box<dyn OutboxStore> = Box::new(JsonlOutbox::new(temp.path().join("outbox.jsonl")));

    let event = store.insert(transition("cust-1", 1)).await.unwrap();
    assert_eq!(event.workflow_name, "onboarding");
    assert_eq!(store.list(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_drained_outbox_stays_small_and_keeps_ids_monotonic() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("outbox.jsonl");

    {
        let store = JsonlOutbox::new(path.clone());
        for i in 0..100 {
            let event = store.insert(transition("cust-1", i)).await.unwrap();
            assert!(store.delete(event.id).await.unwrap());
        }
    }

    let size = std::fs::metadata(&path).unwrap().len();
    assert!(size < 100, "drained log is {} bytes", size);

    let reopened = JsonlOutbox::new(path);
    assert!(reopened.list(10).await.unwrap().is_empty());
    assert_eq!(reopened.insert(transition("cust-2", 1)).await.unwrap().id, 101);
}

#[tokio::test]
async fn test_interrupted_append_does_not_block_later_inserts() {
    use std::io::Write;

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("outbox.jsonl");

    let store = JsonlOutbox::new(path.clone());
    store.insert(transition("cust-1", 1)).await.unwrap();

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(br#"{"op":"inser"#).unwrap();
    drop(file);

    let reopened = JsonlOutbox::new(path);
    let next = reopened.insert(transition("cust-2", 2)).await.unwrap();
    assert_eq!(next.id, 2);
    assert_eq!(reopened.list(10).await.unwrap().len(), 2);
}
