//! Integration tests for the JSON-file backend.
//!
//! These write real files into a temporary directory and reopen them
//! through a fresh backend to check data survives a restart.

use igvroom_protocol::RoomId;
use igvroom_store::{FileBackend, FileStore, ListOptions, Store, StoreProvider};
use serde_json::json;

fn room(id: &str) -> RoomId {
    RoomId::parse(id).expect("valid room id")
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let backend = FileBackend::new(dir.path());
    let store = backend.open(&room("doc"));
    store.put("setting:locus", json!("chr1:1-100")).await.unwrap();
    store
        .put("cursor:alice", json!({ "name": "alice", "timestamp": 1 }))
        .await
        .unwrap();

    // A new backend simulates a process restart.
    let reopened = FileBackend::new(dir.path()).open(&room("doc"));
    assert_eq!(
        reopened.get("setting:locus").await.unwrap(),
        Some(json!("chr1:1-100"))
    );
    let cursors = reopened.list(ListOptions::prefix("cursor:")).await.unwrap();
    assert_eq!(cursors.len(), 1);
    assert_eq!(cursors[0].0, "cursor:alice");
}

#[tokio::test]
async fn test_rooms_use_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::new(dir.path());

    backend.open(&room("a")).put("setting:genome", json!("hg38")).await.unwrap();

    assert!(dir.path().join("a.json").exists());
    assert!(!dir.path().join("b.json").exists());
    assert_eq!(
        backend.open(&room("b")).get("setting:genome").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_batch_delete_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.json");
    let store = FileStore::new(&path);

    store.put("cursor:a", json!(1)).await.unwrap();
    store.put("cursor:b", json!(2)).await.unwrap();
    store.put("setting:locus", json!("chrX")).await.unwrap();

    let removed = store
        .delete(&["cursor:a".to_owned(), "cursor:b".to_owned()])
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({ "setting:locus": "chrX" }));
}

#[tokio::test]
async fn test_missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("nothing.json"));
    assert_eq!(store.get("setting:locus").await.unwrap(), None);
    assert!(store.list(ListOptions::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, b"not json").unwrap();

    let store = FileStore::new(&path);
    assert!(store.get("setting:locus").await.is_err());
}
