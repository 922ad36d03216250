//! Visual field for Luminary sessions: a particle system plus an iterated
//! 2-D map trail, composited onto a [`Surface`] once per frame.

pub mod engine;
pub mod fractal;
pub mod particles;
pub mod surface;

pub use engine::{VisualEngine, VisualInputs, FRAME_INTERVAL};
pub use fractal::{FractalParams, FractalTrail, TRAIL_CAP, TRAIL_EVICT};
pub use particles::{Particle, ParticleField, VisualConfig};
pub use surface::{
    BlendMode, DisplayList, DrawOp, Point, Rgba, Shadow, Stroke, Surface, SURFACE_SIZE,
};
