use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

pub mod error;
pub mod idea;
pub mod schedule;
pub mod task;

pub use error::CoreError;
pub use idea::IdeaNode;
pub use schedule::{Slot, SlotKind, WeeklySchedule};
pub use task::{AssistKind, Priority, Task, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A point or displacement in either world or screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    /// Point on a circle of `radius` around `self` at `angle` radians.
    pub fn on_circle(self, radius: f64, angle: f64) -> Vec2 {
        Vec2::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Measured element size in unscaled layout units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn half(self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Identifies one sub-step bubble: a task plus one of its step labels.
///
/// The canonical string form is `"{taskId}::{label}"`, which is also the key used in
/// the persisted step-position map. Parsing splits on the first separator, so the form
/// only round-trips for task ids without `::`; labels may contain it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepKey {
    pub task_id: TaskId,
    pub label: String,
}

impl StepKey {
    pub const SEPARATOR: &'static str = "::";

    pub fn new(task_id: TaskId, label: impl Into<String>) -> Self {
        Self {
            task_id,
            label: label.into(),
        }
    }

    /// Whether the string form parses back to this key.
    pub fn round_trips(&self) -> bool {
        !self.task_id.as_str().contains(Self::SEPARATOR)
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (task, label) = raw
            .split_once(Self::SEPARATOR)
            .ok_or_else(|| CoreError::InvalidStepKey(raw.to_string()))?;
        if task.is_empty() {
            return Err(CoreError::InvalidStepKey(raw.to_string()));
        }
        Ok(Self::new(TaskId::new(task), label))
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.task_id, Self::SEPARATOR, self.label)
    }
}

impl Serialize for StepKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StepKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StepKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}
