//! Two-receiver hyperbolic position solver.
//!
//! The emitters sit symmetrically on an axis, one full baseline (`2d`)
//! apart. Each channel supplies a distance estimate; once both have
//! reported since the last fix, the pair is combined into an (x, y)
//! position and both estimates are cleared so a stale value never pairs
//! with a later one.

use crate::detector::Channel;

/// Half the emitter baseline, in the same unit as the range estimates.
pub const HALF_BASELINE: f32 = 0.5;

/// A combined two-dimensional position estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub x: f32,
    pub y: f32,
}

/// Pairs per-channel range estimates into fixes.
#[derive(Debug, Default)]
pub struct PositionSolver {
    recent1: Option<f32>,
    recent2: Option<f32>,
}

impl PositionSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest estimate for one channel, overwriting any earlier
    /// unpaired value. Returns a fix once both channels have reported;
    /// both estimates are consumed by that fix.
    pub fn update(&mut self, channel: Channel, position: f32) -> Option<Fix> {
        match channel {
            Channel::One => self.recent1 = Some(position),
            Channel::Two => self.recent2 = Some(position),
        }
        match (self.recent1, self.recent2) {
            (Some(p1), Some(p2)) => {
                self.recent1 = None;
                self.recent2 = None;
                Some(solve(p1, p2))
            }
            _ => None,
        }
    }
}

/// Intersect the two range circles around the emitters at (±d, 0).
///
/// The discriminant goes negative when the ranges are inconsistent with the
/// baseline (measurement noise); y collapses to 0 in that case rather than
/// rejecting the fix.
fn solve(p1: f32, p2: f32) -> Fix {
    let d = HALF_BASELINE;
    let x = (p2 * p2 - p1 * p1) / (4.0 * d);
    let base = -p1.powi(4) - p2.powi(4)
        + 8.0 * d * d * (p1 * p1 + p2 * p2)
        + 2.0 * (p1 * p1 * p2 * p2)
        - 16.0 * d.powi(4);
    let y = if base > 0.0 {
        base.sqrt() / (4.0 * d)
    } else {
        0.0
    };
    Fix { x, y }
}
