use std::collections::VecDeque;

use luminary_signal::AffectState;

use crate::surface::Point;

pub const TRAIL_CAP: usize = 5_000;
/// Points dropped from the old end each time the cap is exceeded.
pub const TRAIL_EVICT: usize = 100;
pub const STEPS_PER_FRAME: usize = 100;
pub const TRAIL_SEED: Point = Point::new(0.1, 0.1);

/// Constants of the map `x' = sin(a·y) + c·cos(a·x)`, `y' = sin(b·x) + d·cos(b·y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    /// Pixels per map unit.
    pub scale: f32,
}

impl FractalParams {
    pub fn for_state(state: AffectState) -> Self {
        match state {
            AffectState::Stressed => Self {
                a: -1.3,
                b: 1.8,
                c: -1.2,
                d: -1.6,
                scale: 100.0,
            },
            AffectState::Calm => Self {
                a: 1.7,
                b: 1.7,
                c: 0.6,
                d: 1.2,
                scale: 120.0,
            },
            AffectState::Intuitive => Self {
                a: -1.4,
                b: 1.6,
                c: 1.0,
                d: 0.7,
                scale: 110.0,
            },
        }
    }

    pub fn iterate(&self, point: Point) -> Point {
        Point::new(
            (self.a * point.y).sin() + self.c * (self.a * point.x).cos(),
            (self.b * point.x).sin() + self.d * (self.b * point.y).cos(),
        )
    }

    /// Maps a trail point onto the surface around `center`.
    pub fn project(&self, point: Point, center: Point) -> Point {
        Point::new(point.x * self.scale + center.x, point.y * self.scale + center.y)
    }
}

/// Bounded FIFO history of map iterations.
#[derive(Debug, Clone)]
pub struct FractalTrail {
    points: VecDeque<Point>,
}

impl Default for FractalTrail {
    fn default() -> Self {
        let mut points = VecDeque::with_capacity(TRAIL_CAP + STEPS_PER_FRAME);
        points.push_back(TRAIL_SEED);
        Self { points }
    }
}

impl FractalTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().copied()
    }

    pub fn last(&self) -> Point {
        self.points.back().copied().unwrap_or(TRAIL_SEED)
    }

    /// Back to the single seed point.
    pub fn reset(&mut self) {
        self.points.clear();
        self.points.push_back(TRAIL_SEED);
    }

    /// Appends one frame's batch of iterations and evicts from the front
    /// while the trail is over the cap.
    pub fn advance(&mut self, params: &FractalParams) {
        let mut point = self.last();
        for _ in 0..STEPS_PER_FRAME {
            point = params.iterate(point);
            self.points.push_back(point);
        }
        while self.points.len() > TRAIL_CAP {
            let evict = TRAIL_EVICT.min(self.points.len());
            self.points.drain(..evict);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_from_seed() {
        let params = FractalParams::for_state(AffectState::Calm);
        let mut trail = FractalTrail::new();
        trail.advance(&params);
        assert_eq!(trail.len(), 1 + STEPS_PER_FRAME);
        let first = trail.points().nth(1).unwrap();
        let expected = params.iterate(TRAIL_SEED);
        assert_eq!(first, expected);
        assert!((expected.x - ((1.7f32 * 0.1).sin() + 0.6 * (1.7f32 * 0.1).cos())).abs() < 1e-6);
    }

    #[test]
    fn eviction_happens_in_blocks() {
        let params = FractalParams::for_state(AffectState::Stressed);
        let mut trail = FractalTrail::new();
        for _ in 0..49 {
            trail.advance(&params);
        }
        assert_eq!(trail.len(), 4_901);
        trail.advance(&params);
        assert_eq!(trail.len(), 4_901);
        trail.advance(&params);
        assert_eq!(trail.len(), 4_901);
    }

    #[test]
    fn reset_restores_seed() {
        let mut trail = FractalTrail::new();
        trail.advance(&FractalParams::for_state(AffectState::Intuitive));
        trail.reset();
        assert_eq!(trail.points().collect::<Vec<_>>(), vec![TRAIL_SEED]);
    }
}
