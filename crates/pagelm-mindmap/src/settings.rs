use crate::error::MindmapError;
use pagelm_core::Size;
use serde::{Deserialize, Serialize};

/// Tunables for the whole mindmap. Every section falls back to its defaults when
/// missing from a settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MindmapSettings {
    pub simulation: SimulationSettings,
    pub camera: CameraSettings,
    pub layout: LayoutSettings,
    pub ideas: IdeaSettings,
}

impl MindmapSettings {
    pub fn from_json(raw: &str) -> Result<Self, MindmapError> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), MindmapError> {
        let camera = &self.camera;
        if !(camera.min_zoom > 0.0 && camera.min_zoom <= camera.max_zoom) {
            return Err(MindmapError::InvalidSettings(format!(
                "zoom bounds must satisfy 0 < min <= max (got {}..{})",
                camera.min_zoom, camera.max_zoom
            )));
        }
        if camera.wheel_step <= 1.0 {
            return Err(MindmapError::InvalidSettings(format!(
                "wheel_step must be greater than 1 (got {})",
                camera.wheel_step
            )));
        }

        let sim = &self.simulation;
        if sim.radial_radius <= 0.0 || sim.collide_separation < 0.0 {
            return Err(MindmapError::InvalidSettings(
                "radial_radius must be positive and collide_separation non-negative".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&sim.alpha_decay) || !(0.0..=1.0).contains(&sim.velocity_decay) {
            return Err(MindmapError::InvalidSettings(
                "alpha_decay must be in [0, 1) and velocity_decay in [0, 1]".to_string(),
            ));
        }

        let layout = &self.layout;
        if layout.step_radii.0 <= 0.0 || layout.step_radii.1 <= 0.0 {
            return Err(MindmapError::InvalidSettings(
                "step radii must be positive".to_string(),
            ));
        }
        if self.ideas.palette.is_empty() {
            return Err(MindmapError::InvalidSettings(
                "idea palette must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Many-body strength; negative repels.
    pub charge_strength: f64,
    pub radial_radius: f64,
    pub radial_strength: f64,
    /// Minimum distance between node centers enforced by the collision pass.
    pub collide_separation: f64,
    pub collide_strength: f64,
    pub initial_alpha: f64,
    pub alpha_decay: f64,
    pub alpha_min: f64,
    pub velocity_decay: f64,
    /// Alpha target held while a drag is live.
    pub drag_alpha_target: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            charge_strength: -60.0,
            radial_radius: 120.0,
            radial_strength: 0.1,
            collide_separation: 36.0,
            collide_strength: 1.0,
            initial_alpha: 0.6,
            alpha_decay: 0.08,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            drag_alpha_target: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom multiplier per wheel notch.
    pub wheel_step: f64,
    /// Minimum zoom after a double-click focus.
    pub focus_zoom: f64,
    /// Persist pan/zoom alongside node positions.
    pub persist: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 3.0,
            wheel_step: 1.1,
            focus_zoom: 1.5,
            persist: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Used when the host cannot measure a task bubble.
    pub default_task_size: Size,
    /// Radius of the ring new tasks are placed on, around the canvas center.
    pub task_ring_radius: f64,
    /// Step bubble ellipse radii (rx, ry).
    pub step_radii: (f64, f64),
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            default_task_size: Size::new(200.0, 72.0),
            task_ring_radius: 280.0,
            step_radii: (42.0, 14.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeaSettings {
    pub palette: Vec<String>,
    /// Hit radius of an idea bubble, in world units.
    pub radius: f64,
    pub link_neighbors: usize,
}

impl Default for IdeaSettings {
    fn default() -> Self {
        Self {
            palette: ["#fde68a", "#bfdbfe", "#bbf7d0", "#fecaca", "#ddd6fe", "#fbcfe8"]
                .into_iter()
                .map(String::from)
                .collect(),
            radius: 36.0,
            link_neighbors: 2,
        }
    }
}
