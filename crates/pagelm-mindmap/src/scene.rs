//! Screen-space render packet handed to the host each frame.

use pagelm_core::{Priority, StepKey, TaskId, TaskStatus, Vec2};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNodeView {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub rect: ScreenRect,
    pub slot_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepBubbleView {
    pub key: StepKey,
    pub label: String,
    pub center: Vec2,
    pub radii: Vec2,
    /// Absent when the task has no scheduled slots.
    pub slot_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorView {
    pub key: StepKey,
    pub from: Vec2,
    pub to: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaView {
    pub id: String,
    pub label: String,
    pub color: String,
    pub center: Vec2,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaLinkView {
    pub a: String,
    pub b: String,
    pub from: Vec2,
    pub to: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MindmapScene {
    pub tasks: Vec<TaskNodeView>,
    pub steps: Vec<StepBubbleView>,
    pub connectors: Vec<ConnectorView>,
    pub ideas: Vec<IdeaView>,
    pub idea_links: Vec<IdeaLinkView>,
    pub pan: Vec2,
    pub zoom: f64,
}

impl MindmapScene {
    pub fn task(&self, id: &TaskId) -> Option<&TaskNodeView> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn step(&self, key: &StepKey) -> Option<&StepBubbleView> {
        self.steps.iter().find(|step| &step.key == key)
    }

    pub fn steps_for<'a>(&'a self, id: &'a TaskId) -> impl Iterator<Item = &'a StepBubbleView> + 'a {
        self.steps.iter().filter(move |step| &step.key.task_id == id)
    }
}
