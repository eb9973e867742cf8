use crate::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    #[default]
    Study,
    Review,
    Buffer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub kind: SlotKind,
}

/// Planned calendar slots for the current week, keyed by task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    pub slots: HashMap<TaskId, Vec<Slot>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: TaskId, slots: Vec<Slot>) {
        self.slots.insert(task_id, slots);
    }

    pub fn slots_for(&self, task_id: &TaskId) -> &[Slot] {
        self.slots.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn slot_count(&self, task_id: &TaskId) -> u32 {
        self.slots_for(task_id).len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_parses_task_keyed_map() {
        let json = r#"{
            "t1": [
                {"start":"2026-10-19T09:00:00Z","end":"2026-10-19T10:00:00Z","kind":"study"},
                {"start":"2026-10-20T09:00:00Z","end":"2026-10-20T09:30:00Z","kind":"lunch"}
            ]
        }"#;
        let schedule: WeeklySchedule = serde_json::from_str(json).unwrap();
        let id = TaskId::new("t1");
        assert_eq!(schedule.slot_count(&id), 2);
        assert_eq!(schedule.slots_for(&id)[1].kind, SlotKind::Other);
        assert_eq!(schedule.slot_count(&TaskId::new("missing")), 0);
    }
}
