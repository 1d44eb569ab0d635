//! Unit tests for record stores

use super::*;

use serde_json::json;
use tempfile::TempDir;

fn record(name: &str, downloads: u64) -> PackageRecord {
    let pkg: PackageDocument = serde_json::from_value(json!({
        "_id": name,
        "name": name,
        "repository": { "type": "git", "url": format!("git+https://github.com/acme/{}.git", name) },
        "time": { "1.0.0": "2023-06-30T12:00:00.000Z" }
    }))
    .unwrap();

    PackageRecord {
        id: name.to_string(),
        github: format!("git+https://github.com/acme/{}.git", name),
        downloads: DownloadsPoint {
            downloads,
            start: "2022-06-30".to_string(),
            end: "2023-06-30".to_string(),
            package: name.to_string(),
        },
        pkg,
    }
}

fn temp_path(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
}

#[test]
fn test_record_serializes_with_underscore_id() {
    let value = serde_json::to_value(record("left-pad", 10)).unwrap();

    assert_eq!(value["_id"], "left-pad");
    assert_eq!(value["pkg"]["_id"], "left-pad");
    assert_eq!(value["pkg"]["name"], "left-pad");
    assert_eq!(value["downloads"]["downloads"], 10);
    assert!(value.get("id").is_none());
}

#[tokio::test]
async fn test_memory_store_replaces_on_upsert() {
    let store = MemoryStore::new();

    store.upsert(record("left-pad", 10)).await.unwrap();
    store.upsert(record("is-odd", 3)).await.unwrap();
    store.upsert(record("left-pad", 20)).await.unwrap();

    assert_eq!(store.count().await, 2);
    let stored = store.get("left-pad").await.unwrap();
    assert_eq!(stored.downloads.downloads, 20);
    assert!(store.get("missing").await.is_none());
}

#[tokio::test]
async fn test_json_lines_store_appends() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_path(&temp_dir).join("out").join("packages.jsonl");

    let store = JsonLinesStore::open(&path).await.unwrap();
    assert_eq!(store.path(), path);
    store.upsert(record("left-pad", 10)).await.unwrap();
    store.upsert(record("is-odd", 3)).await.unwrap();

    // Reopening keeps existing lines
    let store = JsonLinesStore::open(&path).await.unwrap();
    store.upsert(record("left-pad", 20)).await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let records: Vec<PackageRecord> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0], record("left-pad", 10));
    assert_eq!(records[2].downloads.downloads, 20);
}

#[tokio::test]
async fn test_json_lines_store_concurrent_writes_stay_whole() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_path(&temp_dir).join("packages.jsonl");
    let store = JsonLinesStore::open(&path).await.unwrap();

    let writes = (0..50).map(|i| store.upsert(record(&format!("pkg-{}", i), i)));
    for result in futures::future::join_all(writes).await {
        result.unwrap();
    }

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(content.lines().count(), 50);
    for line in content.lines() {
        serde_json::from_str::<PackageRecord>(line).unwrap();
    }
}

#[tokio::test]
async fn test_json_lines_store_open_failure() {
    let temp_dir = TempDir::new().unwrap();
    // A directory cannot be opened for appending
    let result = JsonLinesStore::open(&temp_path(&temp_dir)).await;
    assert!(matches!(result, Err(MinerError::Io { .. })));
}
