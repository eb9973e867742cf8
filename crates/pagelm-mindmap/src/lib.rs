pub mod camera;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod ideas;
pub mod labels;
pub mod scene;
pub mod settings;
pub mod simulation;
pub mod steps;

pub use camera::Camera;
pub use controller::{DefaultMeasure, MindmapController, NodeMeasure};
pub use error::MindmapError;
pub use geometry::{AnchorLine, STEP_RADII, anchor_line, anchor_line_default, ellipse_contains};
pub use gesture::{Gesture, GrabOffset, HitTarget};
pub use ideas::{IdeaLink, idea_links};
pub use labels::{LabelFetchResult, LabelFetcher, StepLabelSource};
pub use scene::{
    ConnectorView, IdeaLinkView, IdeaView, MindmapScene, ScreenRect, StepBubbleView, TaskNodeView,
};
pub use settings::{CameraSettings, IdeaSettings, LayoutSettings, MindmapSettings, SimulationSettings};
pub use simulation::{SimulationEngine, TaskSimSpec, TaskSimulation, TickReport};
pub use steps::{StepPlan, StepSource, distribute_slots};
