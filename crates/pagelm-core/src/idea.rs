use crate::Vec2;
use serde::{Deserialize, Serialize};

/// A freeform, user-authored bubble with no task association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub color: String,
}

impl IdeaNode {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, pos: Vec2) {
        self.x = pos.x;
        self.y = pos.y;
    }
}
