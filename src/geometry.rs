//! Planar joint geometry

/// A point in normalized image coordinates (`y` grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Angle in degrees at vertex `b` formed by the rays `b→a` and `b→c`.
///
/// The result is folded into `[0, 180]` so it does not depend on which side
/// of the vertex the outer points sit. Coincident points (zero-length rays)
/// and non-finite inputs yield `NaN`; every threshold comparison against
/// `NaN` is false, so callers see "no stage transition".
pub fn compute_angle(a: Point2, b: Point2, c: Point2) -> f64 {
    let (ax, ay) = (a.x - b.x, a.y - b.y);
    let (cx, cy) = (c.x - b.x, c.y - b.y);
    if (ax == 0.0 && ay == 0.0) || (cx == 0.0 && cy == 0.0) {
        return f64::NAN;
    }

    let radians = cy.atan2(cx) - ay.atan2(ax);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}
