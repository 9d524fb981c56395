//! Piecewise cubic Bézier paths for scripted flight
//!
//! Paths are generated once from a named pattern and never change; entities
//! hold a cursor (shared path + progress in [0, 1]). Progress advances by
//! speed over an approximate arc length built from sampled chords.

use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Chord samples per segment when estimating arc length
const LENGTH_SAMPLES: usize = 8;

/// Maximum jitter applied to generated control points (pixels)
pub const PATH_JITTER: f32 = 12.0;

/// One cubic Bézier segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
}

impl CubicSegment {
    pub fn new(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Cubic Bernstein basis at local parameter `u` in [0, 1]
    pub fn point(&self, u: f32) -> Vec2 {
        let v = 1.0 - u;
        self.p0 * (v * v * v)
            + self.p1 * (3.0 * v * v * u)
            + self.p2 * (3.0 * v * u * u)
            + self.p3 * (u * u * u)
    }

    /// Sum of chords over evenly spaced samples
    fn approx_length(&self) -> f32 {
        let mut prev = self.p0;
        let mut total = 0.0;
        for i in 1..=LENGTH_SAMPLES {
            let p = self.point(i as f32 / LENGTH_SAMPLES as f32);
            total += (p - prev).length();
            prev = p;
        }
        total
    }
}

/// An immutable chain of cubic segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    start: Vec2,
    segments: Vec<CubicSegment>,
    /// Cumulative arc length at the end of each segment
    cumulative: Vec<f32>,
}

impl Path {
    fn from_segments(start: Vec2, segments: Vec<CubicSegment>) -> Self {
        let mut running = 0.0;
        let cumulative = segments
            .iter()
            .map(|s| {
                running += s.approx_length();
                running
            })
            .collect();
        Self {
            start,
            segments,
            cumulative,
        }
    }

    /// A degenerate path that stays at `at`
    pub fn point(at: Vec2) -> Self {
        Self::from_segments(at, Vec::new())
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn end(&self) -> Vec2 {
        self.segments.last().map(|s| s.p3).unwrap_or(self.start)
    }

    pub fn segments(&self) -> &[CubicSegment] {
        &self.segments
    }

    /// Approximate arc length
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Position at normalized progress `t` (clamped to [0, 1])
    pub fn evaluate(&self, t: f32) -> Vec2 {
        let total = self.length();
        if t <= 0.0 || self.segments.is_empty() || total <= f32::EPSILON {
            return self.start;
        }
        if t >= 1.0 {
            return self.end();
        }

        let distance = t * total;
        let index = self
            .cumulative
            .iter()
            .position(|end| distance <= *end)
            .unwrap_or(self.segments.len() - 1);
        let seg_start = if index == 0 { 0.0 } else { self.cumulative[index - 1] };
        let seg_len = self.cumulative[index] - seg_start;
        let u = if seg_len > f32::EPSILON {
            ((distance - seg_start) / seg_len).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.segments[index].point(u)
    }
}

/// Fluent construction of a path from a start point
#[derive(Debug, Clone)]
pub struct PathBuilder {
    start: Vec2,
    cursor: Vec2,
    segments: Vec<CubicSegment>,
}

impl PathBuilder {
    pub fn starting_at(start: Vec2) -> Self {
        Self {
            start,
            cursor: start,
            segments: Vec::new(),
        }
    }

    pub fn curve_to(mut self, c1: Vec2, c2: Vec2, end: Vec2) -> Self {
        self.segments
            .push(CubicSegment::new(self.cursor, c1, c2, end));
        self.cursor = end;
        self
    }

    /// Straight run expressed as a cubic with control points on the line
    pub fn line_to(self, end: Vec2) -> Self {
        let from = self.cursor;
        self.curve_to(from.lerp(end, 1.0 / 3.0), from.lerp(end, 2.0 / 3.0), end)
    }

    pub fn build(self) -> Path {
        Path::from_segments(self.start, self.segments)
    }
}

/// Progress cursor into a shared path
#[derive(Debug, Clone)]
pub struct PathCursor {
    path: Arc<Path>,
    progress: f32,
    /// Pixels per tick
    pub speed: f32,
}

impl PathCursor {
    pub fn new(path: Path, speed: f32) -> Self {
        Self {
            path: Arc::new(path),
            progress: 0.0,
            speed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn position(&self) -> Vec2 {
        self.path.evaluate(self.progress)
    }

    pub fn is_finished(&self) -> bool {
        self.progress >= 1.0
    }

    /// Advance one tick; returns the new position
    pub fn advance(&mut self) -> Vec2 {
        let length = self.path.length();
        self.progress = if length <= f32::EPSILON {
            1.0
        } else {
            (self.progress + self.speed / length).min(1.0)
        };
        self.position()
    }
}

/// Named trajectory family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathPattern {
    /// Peel out of formation and swoop straight through the target
    Swoop,
    /// Dive, loop back up once, then fall through the target
    LoopBack,
    /// Weave left and right on the way down
    SCurve,
    /// Cross the playfield sideways at the current altitude
    LateralSweep,
    /// Descend to beam altitude above the target and stop
    Capture,
    /// Fly back to a home point (formation slot)
    Return,
    /// Arrive from off-screen with a loop into a home point
    Entry,
}

impl PathPattern {
    /// Patterns an ordinary dive may pick from
    pub const DIVES: [PathPattern; 4] = [
        PathPattern::Swoop,
        PathPattern::LoopBack,
        PathPattern::SCurve,
        PathPattern::LateralSweep,
    ];
}

fn jitter(rng: &mut Pcg32) -> Vec2 {
    Vec2::new(
        rng.random_range(-PATH_JITTER..=PATH_JITTER),
        rng.random_range(-PATH_JITTER..=PATH_JITTER),
    )
}

/// Build a path of `pattern` from `from` toward `target` inside `bounds`.
///
/// Deterministic for a given RNG state. Dive patterns end below the bottom
/// edge; `Capture`, `Return` and `Entry` end exactly at `target`.
pub fn generate(pattern: PathPattern, from: Vec2, target: Vec2, bounds: Vec2, rng: &mut Pcg32) -> Path {
    // Curl toward the side of the screen with more room
    let side = if from.x < bounds.x * 0.5 { -1.0 } else { 1.0 };
    let exit_y = bounds.y + 32.0;

    match pattern {
        PathPattern::Swoop => {
            let mid = Vec2::new(target.x, (from.y + target.y) * 0.5) + jitter(rng);
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(side * 40.0, -40.0),
                    from + Vec2::new(side * 70.0, 20.0) + jitter(rng),
                    mid,
                )
                .curve_to(
                    mid + Vec2::new(0.0, 60.0),
                    target + jitter(rng),
                    Vec2::new(target.x - side * 40.0, exit_y),
                )
                .build()
        }
        PathPattern::LoopBack => {
            let loop_center = Vec2::new(
                (from.x + target.x) * 0.5,
                from.y + (target.y - from.y) * 0.55,
            ) + jitter(rng);
            let r = 48.0;
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(side * 30.0, -30.0),
                    loop_center + Vec2::new(-side * r, -r),
                    loop_center + Vec2::new(-side * r, 0.0),
                )
                .curve_to(
                    loop_center + Vec2::new(-side * r, r * 1.3),
                    loop_center + Vec2::new(side * r, r * 1.3),
                    loop_center + Vec2::new(side * r, 0.0),
                )
                .curve_to(
                    loop_center + Vec2::new(side * r, -r * 1.3),
                    target + Vec2::new(0.0, -80.0) + jitter(rng),
                    Vec2::new(target.x, exit_y),
                )
                .build()
        }
        PathPattern::SCurve => {
            let amplitude = 60.0 + rng.random_range(0.0..30.0);
            let span = exit_y - from.y;
            let a = Vec2::new(from.x + amplitude, from.y + span * 0.33);
            let b = Vec2::new(target.x - amplitude, from.y + span * 0.66);
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(amplitude, 10.0),
                    a + Vec2::new(0.0, -40.0),
                    a + jitter(rng),
                )
                .curve_to(
                    a + Vec2::new(0.0, 40.0),
                    b + Vec2::new(0.0, -40.0),
                    b + jitter(rng),
                )
                .curve_to(
                    b + Vec2::new(0.0, 40.0),
                    Vec2::new(target.x, target.y),
                    Vec2::new(target.x, exit_y),
                )
                .build()
        }
        PathPattern::LateralSweep => {
            let far_x = if side < 0.0 { bounds.x + 32.0 } else { -32.0 };
            let wave = 24.0 + rng.random_range(0.0..16.0);
            let third = (far_x - from.x) / 3.0;
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(third, wave),
                    from + Vec2::new(third * 2.0, -wave) + jitter(rng),
                    Vec2::new(far_x, from.y + wave * 0.5),
                )
                .build()
        }
        PathPattern::Capture => {
            let hover = Vec2::new(target.x, target.y);
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(side * 40.0, -30.0),
                    hover + Vec2::new(side * 60.0, -80.0) + jitter(rng),
                    hover,
                )
                .build()
        }
        PathPattern::Return => PathBuilder::starting_at(from)
            .curve_to(
                from + Vec2::new(0.0, 60.0),
                target + Vec2::new(0.0, -60.0),
                target,
            )
            .build(),
        PathPattern::Entry => {
            let swing = Vec2::new(bounds.x * 0.5 + side * bounds.x * 0.2, bounds.y * 0.5) + jitter(rng);
            PathBuilder::starting_at(from)
                .curve_to(
                    from + Vec2::new(0.0, 80.0),
                    swing + Vec2::new(side * 60.0, -40.0),
                    swing,
                )
                .curve_to(
                    swing + Vec2::new(-side * 60.0, 40.0),
                    target + Vec2::new(0.0, 80.0),
                    target,
                )
                .build()
        }
    }
}
