use crate::camera::Camera;
use pagelm_core::{StepKey, TaskId, Vec2};

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Canvas,
    Task(TaskId),
    Step(StepKey),
    Idea(String),
}

/// Screen-space offset from the dragged entity's anchor to the cursor, captured at
/// pointer-down so the entity does not jump under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabOffset(pub Vec2);

impl GrabOffset {
    pub fn new(cursor: Vec2, entity_screen: Vec2) -> Self {
        Self(cursor - entity_screen)
    }

    pub fn entity_screen(&self, cursor: Vec2) -> Vec2 {
        cursor - self.0
    }

    pub fn entity_world(&self, cursor: Vec2, camera: &Camera) -> Vec2 {
        camera.screen_to_world(self.entity_screen(cursor))
    }
}

/// The single active pointer interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Panning {
        start_pan: Vec2,
        start_cursor: Vec2,
    },
    DraggingTask {
        task: TaskId,
        grab: GrabOffset,
    },
    DraggingStep {
        key: StepKey,
        grab: GrabOffset,
    },
    DraggingIdea {
        id: String,
        grab: GrabOffset,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(
            self,
            Gesture::DraggingTask { .. } | Gesture::DraggingStep { .. } | Gesture::DraggingIdea { .. }
        )
    }

    /// Task whose simulation the gesture is holding warm, if any.
    pub fn held_task(&self) -> Option<&TaskId> {
        match self {
            Gesture::DraggingTask { task, .. } => Some(task),
            Gesture::DraggingStep { key, .. } => Some(&key.task_id),
            _ => None,
        }
    }

    /// Pan implied by the cursor position while panning.
    pub fn pan_for(&self, cursor: Vec2) -> Option<Vec2> {
        match self {
            Gesture::Panning {
                start_pan,
                start_cursor,
            } => Some(*start_pan + (cursor - *start_cursor)),
            _ => None,
        }
    }
}
