//! # 2D segment geometry
//!
//! The geometric primitive underneath path following: a directed line
//! segment with closest-point projection and a three-way classification of
//! where a point's projection falls relative to the segment's ends.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A directed 2D line segment.
#[derive(Debug, Clone, Copy)]
pub struct Seg2 {
    /// Start point of the segment
    pub start: Vector2<f64>,

    /// End point of the segment
    pub end: Vector2<f64>,

    /// Length of the segment
    pub length: f64,

    /// Unit vector pointing from start to end. Zero for a degenerate
    /// (zero-length) segment.
    pub direction: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where a point's projection onto a segment's infinite line falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegProjection {
    /// The projection lies between the segment's ends
    OnSegment,

    /// The projection falls before the start of the segment
    PastStart,

    /// The projection falls beyond the end of the segment
    PastEnd,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Seg2 {
    /// Construct the segment between two points.
    pub fn new(start: Vector2<f64>, end: Vector2<f64>) -> Self {
        let diff = end - start;
        let length = diff.norm();

        let direction = if length > 0.0 {
            diff / length
        } else {
            Vector2::zeros()
        };

        Self {
            start,
            end,
            length,
            direction,
        }
    }

    /// Project a point onto the segment's infinite line.
    ///
    /// Returns the closest point on the line and the classification of where
    /// that projection falls. The classification uses the dot products of
    /// the point against both endpoints, so a degenerate segment classifies
    /// every point as on-segment at the start point.
    pub fn project(&self, point: Vector2<f64>) -> (Vector2<f64>, SegProjection) {
        // Distance along the direction ray from the start to the projection
        let along = (point - self.start).dot(&self.direction);

        let classification = if along < 0.0 {
            SegProjection::PastStart
        } else if along > self.length {
            SegProjection::PastEnd
        } else {
            SegProjection::OnSegment
        };

        (self.start + self.direction * along, classification)
    }

    /// Signed cross-track offset of a point from the segment.
    ///
    /// The magnitude is the distance from the point to its projection on the
    /// segment's line. The sign follows the offset vector's cross product
    /// with the direction ray: a point whose offset crosses the ray
    /// positively gets a negative error. The convention is consistent rather
    /// than tied to a handedness; what matters downstream is that errors on
    /// opposite sides of the path have opposite signs.
    pub fn cross_track(&self, point: Vector2<f64>) -> f64 {
        let (closest, _) = self.project(point);

        // Offset vector from the path to the vehicle
        let offset = point - closest;
        let mag = offset.norm();

        let cross = offset.x * self.direction.y - offset.y * self.direction.x;

        if cross > 0.0 {
            -mag
        } else {
            mag
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn seg() -> Seg2 {
        Seg2::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0))
    }

    #[test]
    fn test_projection_on_segment() {
        let (closest, class) = seg().project(Vector2::new(5.0, -1.0));

        assert_eq!(class, SegProjection::OnSegment);
        assert!((closest - Vector2::new(5.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_projection_past_start() {
        let (closest, class) = seg().project(Vector2::new(-2.0, 3.0));

        assert_eq!(class, SegProjection::PastStart);
        assert!((closest - Vector2::new(-2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_projection_past_end() {
        let (_, class) = seg().project(Vector2::new(11.5, 0.5));

        assert_eq!(class, SegProjection::PastEnd);
    }

    #[test]
    fn test_cross_track_sign_flips_with_side() {
        let below = seg().cross_track(Vector2::new(5.0, -1.0));
        let above = seg().cross_track(Vector2::new(5.0, 1.0));

        assert!((below.abs() - 1.0).abs() < 1e-12);
        assert!((above.abs() - 1.0).abs() < 1e-12);
        assert!(below * above < 0.0, "same-magnitude errors must oppose");
    }

    #[test]
    fn test_cross_track_zero_on_line() {
        assert_eq!(seg().cross_track(Vector2::new(3.0, 0.0)), 0.0);
    }

    #[test]
    fn test_degenerate_segment() {
        let s = Seg2::new(Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0));

        assert_eq!(s.length, 0.0);
        let (closest, class) = s.project(Vector2::new(4.0, 5.0));
        assert_eq!(class, SegProjection::OnSegment);
        assert_eq!(closest, Vector2::new(1.0, 1.0));
    }
}
