//! # Path
//!
//! The waypoint path tracked by the follower. A path is an ordered sequence
//! of 2D nodes joined into segments, with a sliding cursor marking the
//! segment currently being tracked. Updating the path with a vehicle
//! position slides the cursor forwards or backwards and reports the signed
//! cross-track error to the active segment.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::seg::{Seg2, SegProjection};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum node count for a non-looping path to be followable.
///
/// The exhaustion test (`active segment >= node count - 2`) is true for a
/// two-node path before its single segment is ever tracked, so the shortest
/// useful non-looping path has three nodes. A two-node non-looping path is
/// constructible but completes on the first update.
pub const MIN_NON_LOOPING_NODES: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One node of a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the node in the route frame
    pub pos_m: Vector2<f64>,
}

/// A path defining the desired trajectory of the car.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    /// The nodes of the path, in following order
    nodes: Vec<Waypoint>,

    /// Index of the segment currently being tracked
    active_seg: usize,

    /// If true the path wraps back to its first segment on exhaustion
    looping: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("A path needs at least 2 nodes, got {0}")]
    TooFewNodes(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Build a path from a sequence of positions.
    pub fn from_points(
        points: &[Vector2<f64>],
        looping: bool,
    ) -> Result<Self, PathError> {
        if points.len() < 2 {
            return Err(PathError::TooFewNodes(points.len()));
        }

        Ok(Self {
            nodes: points.iter().map(|&pos_m| Waypoint { pos_m }).collect(),
            active_seg: 0,
            looping,
        })
    }

    /// Get the number of nodes in the path
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Index of the segment currently being tracked.
    pub fn active_seg(&self) -> usize {
        self.active_seg
    }

    /// True if this path can actually be followed from its start.
    pub fn is_followable(&self) -> bool {
        self.looping || self.nodes.len() >= MIN_NON_LOOPING_NODES
    }

    /// Begin a following session at the given vehicle position.
    ///
    /// The cursor always restarts at the first segment; sessions are assumed
    /// to begin at the head of the route.
    pub fn start(&mut self, pos_m: Vector2<f64>) {
        self.active_seg = 0;

        if !self.is_followable() {
            warn!(
                "Non-looping path has {} nodes (minimum {}), following will \
                 complete immediately",
                self.nodes.len(),
                MIN_NON_LOOPING_NODES
            );
        }

        debug!(
            "Path started on segment 0, vehicle at ({:.2}, {:.2})",
            pos_m.x, pos_m.y
        );
    }

    /// Track the vehicle position against the path.
    ///
    /// Returns the signed cross-track error to the active segment, or `None`
    /// once the path is exhausted. Exhaustion is terminal for a non-looping
    /// path; a looping path wraps back to its first segment and keeps going.
    pub fn update(&mut self, pos_m: Vector2<f64>) -> Option<f64> {
        // Exhaustion test. The subtraction saturates so a degenerate
        // two-node path is exhausted before its only segment is tracked.
        if self.active_seg >= self.nodes.len().saturating_sub(2) {
            if !self.looping {
                return None;
            }

            self.active_seg = 0;
        }

        let seg = Seg2::new(
            self.nodes[self.active_seg].pos_m,
            self.nodes[self.active_seg + 1].pos_m,
        );

        let (_, projection) = seg.project(pos_m);

        // Slide the cursor: past the end of the segment moves on to the
        // next, past the start falls back to the previous (floored at the
        // first segment)
        match projection {
            SegProjection::PastEnd => {
                self.active_seg += 1;
            }
            SegProjection::PastStart => {
                self.active_seg = self.active_seg.saturating_sub(1);
            }
            SegProjection::OnSegment => (),
        }

        // The error is always relative to the segment that was active when
        // this position arrived
        Some(seg.cross_track(pos_m))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Three collinear nodes along +x
    fn straight_path(looping: bool) -> Path {
        Path::from_points(
            &[
                Vector2::new(0.0, 0.0),
                Vector2::new(10.0, 0.0),
                Vector2::new(20.0, 0.0),
            ],
            looping,
        )
        .unwrap()
    }

    #[test]
    fn test_too_few_nodes_rejected() {
        assert!(Path::from_points(&[Vector2::new(0.0, 0.0)], false).is_err());
        assert!(Path::from_points(&[], true).is_err());
    }

    #[test]
    fn test_two_node_non_looping_completes_immediately() {
        let mut path = Path::from_points(
            &[Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)],
            false,
        )
        .unwrap();

        assert!(!path.is_followable());

        path.start(Vector2::new(0.0, 0.0));
        assert!(path.update(Vector2::new(1.0, 0.0)).is_none());
    }

    #[test]
    fn test_cross_track_sign_scenario() {
        let mut path = straight_path(false);
        path.start(Vector2::new(0.0, 0.0));

        let below = path.update(Vector2::new(5.0, -1.0)).unwrap();
        assert_eq!(path.active_seg(), 0);
        assert!((below.abs() - 1.0).abs() < 1e-12);

        let above = path.update(Vector2::new(5.0, 1.0)).unwrap();
        assert!((above.abs() - 1.0).abs() < 1e-12);
        assert!(below * above < 0.0, "errors either side must oppose");
    }

    #[test]
    fn test_completion_scenario() {
        let mut path = straight_path(false);
        path.start(Vector2::new(0.0, 0.0));

        // On the first segment
        assert!(path.update(Vector2::new(5.0, 0.0)).is_some());
        assert_eq!(path.active_seg(), 0);

        // Passing the end of segment 0 advances the cursor to the last
        // valid segment index, node count - 2
        assert!(path.update(Vector2::new(15.0, 0.0)).is_some());
        assert_eq!(path.active_seg(), path.num_nodes() - 2);

        // The next update is terminal
        assert!(path.update(Vector2::new(25.0, 0.0)).is_none());
    }

    #[test]
    fn test_cursor_floors_at_first_segment() {
        let mut path = straight_path(false);
        path.start(Vector2::new(0.0, 0.0));

        // Behind the start of segment 0: the cursor cannot retreat further
        assert!(path.update(Vector2::new(-3.0, 0.5)).is_some());
        assert_eq!(path.active_seg(), 0);
    }

    #[test]
    fn test_looping_path_wraps() {
        let mut path = straight_path(true);
        path.start(Vector2::new(0.0, 0.0));

        // Drive the cursor to exhaustion
        path.update(Vector2::new(15.0, 0.0));
        assert_eq!(path.active_seg(), 1);

        // A looping path wraps instead of terminating
        let err = path.update(Vector2::new(5.0, -2.0));
        assert!(err.is_some());
        assert_eq!(path.active_seg(), 0);
        assert!((err.unwrap().abs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_restart_resets_cursor() {
        let mut path = straight_path(false);
        path.start(Vector2::new(0.0, 0.0));

        path.update(Vector2::new(15.0, 0.0));
        assert_eq!(path.active_seg(), 1);

        path.start(Vector2::new(0.0, 0.0));
        assert_eq!(path.active_seg(), 0);
    }
}
