use crate::settings::CameraSettings;
use pagelm_core::{Size, Vec2};
use serde::{Deserialize, Serialize};

/// Pan/zoom transform between world and screen coordinates:
/// `screen = pan + world * zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pan: Vec2,
    pub zoom: f64,
    #[serde(skip, default = "default_zoom_bounds")]
    zoom_bounds: (f64, f64),
}

fn default_zoom_bounds() -> (f64, f64) {
    let defaults = CameraSettings::default();
    (defaults.min_zoom, defaults.max_zoom)
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            zoom_bounds: default_zoom_bounds(),
        }
    }
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self::default().with_bounds(settings.min_zoom, settings.max_zoom)
    }

    /// Apply zoom bounds, clamping the current zoom into them.
    pub fn with_bounds(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.zoom_bounds = (min_zoom, max_zoom);
        self.zoom = self.clamp_zoom(self.zoom);
        self
    }

    pub fn min_zoom(&self) -> f64 {
        self.zoom_bounds.0
    }

    pub fn max_zoom(&self) -> f64 {
        self.zoom_bounds.1
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return self.zoom;
        }
        zoom.clamp(self.zoom_bounds.0, self.zoom_bounds.1)
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.pan) / self.zoom
    }

    pub fn world_to_screen_size(&self, size: Size) -> Size {
        Size::new(size.width * self.zoom, size.height * self.zoom)
    }

    /// Change zoom so the world point under `cursor` stays under `cursor`.
    pub fn zoom_at(&mut self, cursor: Vec2, new_zoom: f64) {
        let new_zoom = self.clamp_zoom(new_zoom);
        if (new_zoom - self.zoom).abs() <= f64::EPSILON {
            return;
        }
        let world = self.screen_to_world(cursor);
        self.zoom = new_zoom;
        self.pan = cursor - world * new_zoom;
    }

    /// One wheel notch around `cursor`; negative `delta_y` zooms in.
    pub fn wheel(&mut self, cursor: Vec2, delta_y: f64, wheel_step: f64) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y < 0.0 {
            wheel_step
        } else {
            1.0 / wheel_step
        };
        self.zoom_at(cursor, self.zoom * factor);
    }

    /// Center `world` on the canvas, zooming in to at least `focus_zoom`.
    pub fn focus(&mut self, world: Vec2, canvas: Size, focus_zoom: f64) {
        self.zoom = self.clamp_zoom(self.zoom.max(focus_zoom));
        self.pan = canvas.half() - world * self.zoom;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = self.clamp_zoom(1.0);
    }
}
