use std::f32::consts::TAU;

use luminary_signal::{AffectState, BASELINE_BPM};
use rand::Rng;

use crate::surface::Point;

/// Extra rotation applied to INTUITIVE spawn velocities, in radians.
pub const SPIRAL_ANGLE: f32 = 0.2;

/// Per-state appearance of the particle field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualConfig {
    pub particle_count: usize,
    pub particle_speed: f32,
    pub base_color: [u8; 3],
}

impl VisualConfig {
    pub fn for_state(state: AffectState) -> Self {
        match state {
            AffectState::Stressed => Self {
                particle_count: 150,
                particle_speed: 2.0,
                base_color: [255, 69, 0],
            },
            AffectState::Calm => Self {
                particle_count: 50,
                particle_speed: 0.5,
                base_color: [30, 144, 255],
            },
            AffectState::Intuitive => Self {
                particle_count: 100,
                particle_speed: 1.0,
                base_color: [0, 255, 127],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    /// Remaining life in frames.
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Spawns at `center` moving in a random direction.
    pub fn spawn<R: Rng + ?Sized>(state: AffectState, center: Point, rng: &mut R) -> Self {
        let config = VisualConfig::for_state(state);
        let angle = rng.gen::<f32>() * TAU;
        let speed = rng.gen::<f32>() * config.particle_speed + 0.1;
        let (mut vx, mut vy) = (angle.cos() * speed, angle.sin() * speed);
        if state == AffectState::Intuitive {
            (vx, vy) = rotate(vx, vy, SPIRAL_ANGLE);
        }
        let max_life = rng.gen::<f32>() * 60.0 + 120.0;
        Self {
            position: center,
            vx,
            vy,
            radius: rng.gen::<f32>() * 2.0 + 1.0,
            life: max_life,
            max_life,
        }
    }

    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            0.0
        } else {
            (self.life / self.max_life).clamp(0.0, 1.0)
        }
    }

    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

fn rotate(x: f32, y: f32, angle: f32) -> (f32, f32) {
    let (sin, cos) = angle.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Population of particles drifting out from the centre.
#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// One frame: spawn a particle if below the state's target, move every
    /// particle by its velocity scaled with the heart rate, age it and cull
    /// the dead.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        state: AffectState,
        heart_rate: f32,
        center: Point,
        rng: &mut R,
    ) {
        if self.particles.len() < VisualConfig::for_state(state).particle_count {
            self.particles.push(Particle::spawn(state, center, rng));
        }
        self.advance(heart_rate / BASELINE_BPM);
    }

    fn advance(&mut self, pace: f32) {
        for particle in &mut self.particles {
            particle.position.x += particle.vx * pace;
            particle.position.y += particle.vy * pace;
            particle.life -= 1.0;
        }
        self.particles.retain(Particle::is_alive);
    }
}
