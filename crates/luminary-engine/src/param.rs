/// Interpolation from one automation point to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    Step,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParamPoint {
    frame: u64,
    value: f32,
    shape: RampShape,
}

/// Sample-accurate automatable parameter, e.g. a voice's gain.
///
/// Points are kept sorted by frame; the shape stored on a point governs the
/// segment that starts at it. After the last point the value holds.
#[derive(Debug, Clone)]
pub struct AudioParam {
    default: f32,
    points: Vec<ParamPoint>,
}

impl AudioParam {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Holds `value` from `frame` onwards.
    pub fn set_value_at(&mut self, value: f32, frame: u64) {
        self.insert(ParamPoint {
            frame,
            value,
            shape: RampShape::Step,
        });
    }

    /// Ramps linearly from the preceding point to `value` at `frame`. With no
    /// preceding point the ramp starts from the default value at `now`.
    pub fn linear_ramp_to(&mut self, value: f32, frame: u64, now: u64) {
        let index = self.points.partition_point(|point| point.frame < frame);
        if index == 0 {
            self.points.insert(
                0,
                ParamPoint {
                    frame: now.min(frame),
                    value: self.default,
                    shape: RampShape::Linear,
                },
            );
        } else {
            self.points[index - 1].shape = RampShape::Linear;
        }
        self.set_value_at(value, frame);
    }

    /// Drops every point at or after `frame` and holds the value the
    /// parameter had there.
    pub fn cancel_and_hold(&mut self, frame: u64) {
        let held = self.value_at(frame);
        let index = self.points.partition_point(|point| point.frame < frame);
        self.points.truncate(index);
        if let Some(last) = self.points.last_mut() {
            last.shape = RampShape::Step;
        }
        self.set_value_at(held, frame);
    }

    /// Forgets points that can no longer influence values at or after
    /// `frame`. The newest point before `frame` is retained.
    pub fn discard_before(&mut self, frame: u64) {
        let index = self.points.partition_point(|point| point.frame <= frame);
        if index > 1 {
            self.points.drain(..index - 1);
        }
    }

    pub fn value_at(&self, frame: u64) -> f32 {
        let Some(first) = self.points.first() else {
            return self.default;
        };

        let index = self.points.partition_point(|point| point.frame <= frame);
        if index == 0 {
            return first.value;
        }

        let prev = &self.points[index - 1];
        if prev.frame == frame || index == self.points.len() {
            return prev.value;
        }

        let next = &self.points[index];
        match prev.shape {
            RampShape::Step => prev.value,
            RampShape::Linear => {
                let span = next.frame.saturating_sub(prev.frame);
                if span == 0 {
                    return next.value;
                }
                let t = (frame.saturating_sub(prev.frame) as f64 / span as f64).clamp(0.0, 1.0);
                prev.value + (next.value - prev.value) * t as f32
            }
        }
    }

    fn insert(&mut self, point: ParamPoint) {
        match self
            .points
            .binary_search_by_key(&point.frame, |existing| existing.frame)
        {
            Ok(index) => self.points[index] = point,
            Err(index) => self.points.insert(index, point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_value_without_points() {
        let param = AudioParam::new(0.25);
        assert_eq!(param.value_at(1_000), 0.25);
    }

    #[test]
    fn step_holds_until_next_point() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at(0.2, 0);
        param.set_value_at(0.8, 100);
        assert_eq!(param.value_at(99), 0.2);
        assert_eq!(param.value_at(100), 0.8);
        assert_eq!(param.value_at(10_000), 0.8);
    }

    #[test]
    fn attack_and_decay_envelope() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at(0.0, 0);
        param.linear_ramp_to(0.1, 200, 0);
        param.linear_ramp_to(0.0, 600, 0);
        assert!((param.value_at(100) - 0.05).abs() < 1e-6);
        assert!((param.value_at(200) - 0.1).abs() < 1e-6);
        assert!((param.value_at(400) - 0.05).abs() < 1e-6);
        assert_eq!(param.value_at(600), 0.0);
        assert_eq!(param.value_at(650), 0.0);
    }

    #[test]
    fn cancel_and_hold_freezes_mid_ramp() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at(0.0, 0);
        param.linear_ramp_to(1.0, 100, 0);
        param.cancel_and_hold(50);
        assert!((param.value_at(50) - 0.5).abs() < 1e-6);
        assert!((param.value_at(90) - 0.5).abs() < 1e-6);
        param.linear_ramp_to(0.0, 60, 50);
        assert!((param.value_at(55) - 0.25).abs() < 1e-6);
        assert_eq!(param.value_at(70), 0.0);
    }

    #[test]
    fn discard_keeps_latest_past_point() {
        let mut param = AudioParam::new(1.0);
        for frame in 0..10 {
            param.set_value_at(frame as f32, frame * 10);
        }
        param.discard_before(55);
        assert_eq!(param.len(), 5);
        assert_eq!(param.value_at(55), 5.0);
    }
}
