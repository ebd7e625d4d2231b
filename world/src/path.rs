//! Fixed polyline enemies travel along.

use breach_defence_core::{PathPosition, WorldPoint};
use glam::Vec2;

/// Location and heading sampled at a path position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    /// Cartesian location.
    pub point: WorldPoint,
    /// Angle of the segment vector in radians.
    pub heading: f32,
    /// Indicates the position is at or past the end of the path.
    pub terminal: bool,
}

/// Maps continuous path positions onto an immutable polyline.
#[derive(Clone, Debug)]
pub struct PathModel {
    waypoints: Vec<Vec2>,
    headings: Vec<f32>,
}

impl PathModel {
    /// Builds a path model from validated waypoints.
    ///
    /// Callers are expected to pass at least two distinct waypoints, which
    /// `Ruleset` guarantees.
    #[must_use]
    pub fn new(waypoints: &[WorldPoint]) -> Self {
        let waypoints: Vec<Vec2> = waypoints
            .iter()
            .map(|point| Vec2::new(point.x(), point.y()))
            .collect();
        let headings = waypoints
            .windows(2)
            .map(|pair| {
                let delta = pair[1] - pair[0];
                delta.y.atan2(delta.x)
            })
            .collect();
        Self {
            waypoints,
            headings,
        }
    }

    /// Number of segments, which is the path length in path units.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.headings.len() as f32
    }

    /// Reports whether the position is at or past the end of the path.
    #[must_use]
    pub fn is_terminal(&self, position: PathPosition) -> bool {
        position.segment() >= self.headings.len()
    }

    /// Samples the coordinate and heading at the provided position.
    #[must_use]
    pub fn sample(&self, position: PathPosition) -> PathSample {
        let (Some(first), Some(last)) = (self.waypoints.first(), self.waypoints.last()) else {
            return PathSample {
                point: WorldPoint::new(0.0, 0.0),
                heading: 0.0,
                terminal: true,
            };
        };

        let segment = position.segment();
        if self.is_terminal(position) {
            return PathSample {
                point: to_point(*last),
                heading: self.headings.last().copied().unwrap_or(0.0),
                terminal: true,
            };
        }

        if position.get() <= 0.0 {
            return PathSample {
                point: to_point(*first),
                heading: self.headings[0],
                terminal: false,
            };
        }

        let start = self.waypoints[segment];
        let end = self.waypoints[segment + 1];
        PathSample {
            point: to_point(start.lerp(end, position.fraction())),
            heading: self.headings[segment],
            terminal: false,
        }
    }
}

fn to_point(vector: Vec2) -> WorldPoint {
    WorldPoint::new(vector.x, vector.y)
}
