use pagelm_core::Vec2;

/// Default step bubble radii (rx, ry).
pub const STEP_RADII: Vec2 = Vec2::new(42.0, 14.0);

/// Connector endpoints: `a` lies on the center ellipse, `b` on the step ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorLine {
    pub a: Vec2,
    pub b: Vec2,
}

/// Distance from an ellipse's center to its boundary along direction `u`, in units of
/// `|u|`. Exact for axis-aligned ellipses.
fn boundary_scale(u: Vec2, radii: Vec2) -> f64 {
    1.0 / ((u.x * u.x) / (radii.x * radii.x) + (u.y * u.y) / (radii.y * radii.y)).sqrt()
}

/// Compute where a straight connector between two axis-aligned ellipses should start
/// and end so that it touches each shape's edge instead of overlapping its interior.
///
/// The direction is normalised by `max(|d|, 1)`; the boundary scale compensates for
/// the floor, so the anchors stay exact for any non-zero separation. Coincident
/// centers have no direction and both anchors collapse onto their own centers.
pub fn anchor_line(center: Vec2, center_radii: Vec2, step: Vec2, step_radii: Vec2) -> AnchorLine {
    let d = step - center;
    let dist = d.length();
    if dist == 0.0 || !dist.is_finite() {
        return AnchorLine { a: center, b: step };
    }

    let u = d / dist.max(1.0);
    let a = center + u * boundary_scale(u, center_radii);
    let b = step - u * boundary_scale(u, step_radii);
    AnchorLine { a, b }
}

pub fn anchor_line_default(center: Vec2, center_radii: Vec2, step: Vec2) -> AnchorLine {
    anchor_line(center, center_radii, step, STEP_RADII)
}

/// Normalised ellipse equation value: `< 1` inside, `1` on the boundary.
pub fn ellipse_value(center: Vec2, radii: Vec2, point: Vec2) -> f64 {
    let dx = (point.x - center.x) / radii.x;
    let dy = (point.y - center.y) / radii.y;
    dx * dx + dy * dy
}

pub fn ellipse_contains(center: Vec2, radii: Vec2, point: Vec2) -> bool {
    ellipse_value(center, radii, point) <= 1.0
}
