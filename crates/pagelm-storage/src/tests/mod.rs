use super::*;
use pagelm_core::{IdeaNode, StepKey, TaskId, Vec2};
use std::collections::HashMap;

struct FailingStore;

impl KvStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".to_string()))
    }
}

fn idea(id: &str, x: f64, y: f64) -> IdeaNode {
    IdeaNode {
        id: id.to_string(),
        x,
        y,
        label: format!("idea {id}"),
        color: "#fde68a".to_string(),
    }
}

#[test]
fn test_sqlite_kv_roundtrip() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    assert!(storage.is_empty()?);

    storage.set("a", "1")?;
    storage.set("a", "2")?;
    storage.set("b", "3")?;

    assert_eq!(storage.get("a")?.as_deref(), Some("2"));
    assert_eq!(storage.len()?, 2);

    storage.remove("a")?;
    assert_eq!(storage.get("a")?, None);
    Ok(())
}

#[test]
fn test_schema_version_is_recorded() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    assert_eq!(storage.schema_version()?, SCHEMA_VERSION);
    Ok(())
}

#[test]
fn test_sqlite_file_survives_reopen() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
    let path = dir.path().join("mindmap.db");

    {
        let store = MindmapStore::new(Storage::open(&path)?);
        assert!(store.save_ideas(&[idea("i1", 10.0, 20.0)]));
        assert!(store.save_step_labels(&TaskId::new("t1"), &["Draft".to_string()]));
    }

    let store = MindmapStore::new(Storage::open(&path)?);
    assert_eq!(store.load_ideas(), vec![idea("i1", 10.0, 20.0)]);
    assert_eq!(
        store.load_step_labels(&TaskId::new("t1")),
        Some(vec!["Draft".to_string()])
    );
    Ok(())
}

#[test]
fn test_newer_schema_is_rejected() -> Result<(), StorageError> {
    let dir = tempfile::tempdir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
    let path = dir.path().join("future.db");
    {
        let storage = Storage::open(&path)?;
        storage.set_schema_version(SCHEMA_VERSION + 1)?;
    }
    assert!(matches!(
        Storage::open(&path),
        Err(StorageError::Unavailable(_))
    ));
    Ok(())
}

#[test]
fn test_step_positions_use_canonical_keys() {
    let kv = MemoryStore::new();
    let store = MindmapStore::new(kv.clone());

    let mut positions = HashMap::new();
    positions.insert(StepKey::new(TaskId::new("t1"), "Outline"), Vec2::new(5.0, -3.0));
    assert!(store.save_step_positions(&positions));

    let raw = kv.get(STEP_POSITIONS_KEY).unwrap().unwrap();
    assert_eq!(raw, r#"{"t1::Outline":{"x":5.0,"y":-3.0}}"#);
    assert_eq!(store.load_step_positions(), positions);
}

#[test]
fn test_ambiguous_step_keys_are_not_written() {
    let kv = MemoryStore::new();
    let store = MindmapStore::new(kv.clone());

    let mut positions = HashMap::new();
    positions.insert(StepKey::new(TaskId::new("t1"), "Part A::Intro"), Vec2::new(1.0, 2.0));
    positions.insert(StepKey::new(TaskId::new("course::101"), "Draft"), Vec2::new(3.0, 4.0));
    assert!(store.save_step_positions(&positions));

    let loaded = store.load_step_positions();
    assert_eq!(loaded.len(), 1);
    assert_eq!(
        loaded[&StepKey::new(TaskId::new("t1"), "Part A::Intro")],
        Vec2::new(1.0, 2.0)
    );
}

#[test]
fn test_non_finite_positions_are_not_written() {
    let store = MindmapStore::in_memory();
    let mut positions = HashMap::new();
    positions.insert(TaskId::new("ok"), Vec2::new(1.0, 1.0));
    positions.insert(TaskId::new("bad"), Vec2::new(f64::NAN, 1.0));
    assert!(store.save_task_positions(&positions));

    let loaded = store.load_task_positions();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key(&TaskId::new("ok")));
}

#[test]
fn test_malformed_json_is_treated_as_absent() {
    let kv = MemoryStore::new();
    kv.set(IDEAS_KEY, "{not json").unwrap();
    kv.set(STEP_POSITIONS_KEY, r#"{"no-separator":{"x":1,"y":2},"t::Read":{"x":3,"y":4}}"#)
        .unwrap();
    kv.set(&step_labels_key(&TaskId::new("t")), "42").unwrap();

    let store = MindmapStore::new(kv);
    assert!(store.load_ideas().is_empty());
    assert!(store.load_step_labels(&TaskId::new("t")).is_none());
    assert!(!store.has_step_labels(&TaskId::new("t")));

    let positions = store.load_step_positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(
        positions[&StepKey::new(TaskId::new("t"), "Read")],
        Vec2::new(3.0, 4.0)
    );

    assert!(matches!(
        store.try_load::<Vec<IdeaNode>>(IDEAS_KEY),
        Err(StorageError::Json(_))
    ));
}

#[test]
fn test_unavailable_storage_degrades_quietly() {
    let store = MindmapStore::new(FailingStore);
    assert!(store.load_ideas().is_empty());
    assert!(store.load_step_positions().is_empty());
    assert!(store.load_step_labels(&TaskId::new("t")).is_none());
    assert!(!store.has_step_labels(&TaskId::new("t")));
    assert!(!store.save_ideas(&[idea("i", 0.0, 0.0)]));
}

#[test]
fn test_empty_label_list_is_a_stored_value() {
    let store = MindmapStore::in_memory();
    let id = TaskId::new("t1");
    assert!(!store.has_step_labels(&id));
    assert!(store.save_step_labels(&id, &[]));
    assert!(store.has_step_labels(&id));
    assert_eq!(store.load_step_labels(&id), Some(Vec::new()));
}
