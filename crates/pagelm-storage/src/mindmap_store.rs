use super::*;
use pagelm_core::{IdeaNode, StepKey, TaskId, Vec2};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

pub const IDEAS_KEY: &str = "planner.mindmap.ideas";
pub const STEP_POSITIONS_KEY: &str = "planner.mindmap.stepPositions";
pub const TASK_POSITIONS_KEY: &str = "planner.mindmap.taskPositions";
pub const CAMERA_KEY: &str = "planner.mindmap.camera";
pub const STEP_LABELS_PREFIX: &str = "planner.aiSteps.";

pub fn step_labels_key(task_id: &TaskId) -> String {
    format!("{STEP_LABELS_PREFIX}{task_id}")
}

/// Typed access to the mindmap's persisted layout state.
///
/// The `try_*` methods report every failure. The plain methods are what the controller
/// uses: read failures and malformed values degrade to "nothing stored", write failures
/// are logged and reported as `false`, so the session keeps working without durability.
pub struct MindmapStore {
    kv: Box<dyn KvStore>,
}

impl MindmapStore {
    pub fn new(kv: impl KvStore + 'static) -> Self {
        Self { kv: Box::new(kv) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.kv.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw)
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Ignoring persisted value for {}: {}", key, err);
                None
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Failed to persist {}: {}", key, err);
                false
            }
        }
    }

    pub fn load_ideas(&self) -> Vec<IdeaNode> {
        self.load::<Vec<IdeaNode>>(IDEAS_KEY)
            .unwrap_or_default()
            .into_iter()
            .filter(|idea| idea.x.is_finite() && idea.y.is_finite())
            .collect()
    }

    pub fn save_ideas(&self, ideas: &[IdeaNode]) -> bool {
        self.save(IDEAS_KEY, ideas)
    }

    /// Step positions keyed by `"{taskId}::{label}"`. Entries with unparseable keys are
    /// skipped individually rather than discarding the whole map.
    pub fn load_step_positions(&self) -> HashMap<StepKey, Vec2> {
        let raw = self
            .load::<HashMap<String, Vec2>>(STEP_POSITIONS_KEY)
            .unwrap_or_default();
        raw.into_iter()
            .filter_map(|(key, pos)| match StepKey::parse(&key) {
                Ok(step) if pos.is_finite() => Some((step, pos)),
                Ok(_) => None,
                Err(err) => {
                    tracing::debug!("Skipping persisted step position: {}", err);
                    None
                }
            })
            .collect()
    }

    /// Keys whose task id contains the `::` separator are not written: they would load
    /// back under a different task.
    pub fn save_step_positions(&self, positions: &HashMap<StepKey, Vec2>) -> bool {
        let writable: HashMap<&StepKey, &Vec2> = positions
            .iter()
            .filter(|(key, pos)| {
                if !key.round_trips() {
                    tracing::warn!("Not persisting position of {}: ambiguous task id", key);
                    return false;
                }
                pos.is_finite()
            })
            .collect();
        self.save(STEP_POSITIONS_KEY, &writable)
    }

    pub fn load_task_positions(&self) -> HashMap<TaskId, Vec2> {
        self.load::<HashMap<TaskId, Vec2>>(TASK_POSITIONS_KEY)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, pos)| pos.is_finite())
            .collect()
    }

    pub fn save_task_positions(&self, positions: &HashMap<TaskId, Vec2>) -> bool {
        let finite: HashMap<&TaskId, &Vec2> =
            positions.iter().filter(|(_, pos)| pos.is_finite()).collect();
        self.save(TASK_POSITIONS_KEY, &finite)
    }

    /// The effective step-label list stored for a task, if any. An empty list is a real
    /// value: the user deleted every step.
    pub fn load_step_labels(&self, task_id: &TaskId) -> Option<Vec<String>> {
        self.load(&step_labels_key(task_id))
    }

    pub fn save_step_labels(&self, task_id: &TaskId, labels: &[String]) -> bool {
        self.save(&step_labels_key(task_id), labels)
    }

    /// Whether a readable label list is stored. A malformed value does not count.
    pub fn has_step_labels(&self, task_id: &TaskId) -> bool {
        self.load_step_labels(task_id).is_some()
    }
}
