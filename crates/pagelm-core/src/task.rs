use crate::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// Kinds of AI study material the planner can generate for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssistKind {
    Summary,
    StudyGuide,
    Flashcards,
    Quiz,
}

/// A planner task as supplied by the planner subsystem. Read-only to the mindmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Free-text classification ("essay", "exam", ...), used to infer default steps.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimate_minutes: Option<u32>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(id),
            title: title.into(),
            kind: None,
            due_at: None,
            estimate_minutes: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            notes: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Text the step classifier looks at: title plus the optional kind.
    pub fn classification_text(&self) -> String {
        match &self.kind {
            Some(kind) => format!("{} {}", self.title, kind),
            None => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes_with_defaults() {
        let task: Task = serde_json::from_str(r#"{"id":"t1","title":"Read chapter 3"}"#).unwrap();
        assert_eq!(task.id, TaskId::new("t1"));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.due_at.is_none());
    }

    #[test]
    fn test_task_uses_camel_case_fields() {
        let json = r#"{"id":"t2","title":"Essay","estimateMinutes":90,"status":"in_progress","dueAt":"2026-10-20T12:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.estimate_minutes, Some(90));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.due_at.is_some());
    }

    #[test]
    fn test_classification_text_includes_kind() {
        let task = Task::new("t", "Chapter 4").with_kind("reading");
        assert_eq!(task.classification_text(), "Chapter 4 reading");
    }
}
