use std::f32::consts::{FRAC_PI_2, TAU};
use std::time::Duration;

use luminary_signal::AffectState;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::fractal::{FractalParams, FractalTrail};
use crate::particles::{ParticleField, VisualConfig};
use crate::surface::{BlendMode, Point, Rgba, Shadow, Stroke, Surface};

/// Host refresh interval the session paces frames at.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

const BACKDROP: Rgba = Rgba {
    r: 10,
    g: 10,
    b: 35,
    a: 0.1,
};
const GROUNDING: Rgba = Rgba {
    r: 210,
    g: 105,
    b: 30,
    a: 0.4,
};
const CRYSTAL_POINTS: usize = 6;
const RING_CIRCLES: usize = 6;

/// What a frame reads from the session when it is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualInputs {
    pub state: AffectState,
    pub heart_rate: f32,
    pub grounding: bool,
    pub attunement: bool,
}

/// Particle and fractal renderer.
///
/// Idle until [`VisualEngine::start`]; [`VisualEngine::stop`] drops every
/// particle, resets the trail and wipes the surface.
pub struct VisualEngine {
    rng: StdRng,
    particles: ParticleField,
    trail: FractalTrail,
    time: u64,
    running: bool,
}

impl Default for VisualEngine {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl VisualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic particle spawning.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            particles: ParticleField::new(),
            trail: FractalTrail::new(),
            time: 0,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::debug!(frame = self.time, "visual field started");
        }
        self.running = true;
    }

    pub fn stop(&mut self, surface: &mut dyn Surface) {
        if self.running {
            tracing::debug!(
                frame = self.time,
                particles = self.particles.len(),
                "visual field stopped"
            );
        }
        self.running = false;
        self.particles.clear();
        self.trail.reset();
        surface.clear();
    }

    /// Frames drawn since creation.
    pub fn frame_count(&self) -> u64 {
        self.time
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn trail(&self) -> &FractalTrail {
        &self.trail
    }

    /// Draws one composited frame. Does nothing while stopped.
    pub fn render_frame(&mut self, surface: &mut dyn Surface, inputs: &VisualInputs) {
        if !self.running {
            return;
        }
        let (width, height) = surface.size();
        let center = Point::new(width / 2.0, height / 2.0);
        let config = VisualConfig::for_state(inputs.state);
        let base = Rgba::from_array(config.base_color);
        let t = self.time as f32;

        surface.begin_frame();
        surface.set_blend(BlendMode::SourceOver);
        surface.fill_rect(Point::new(0.0, 0.0), width, height, BACKDROP);

        if inputs.attunement {
            let params = FractalParams::for_state(inputs.state);
            self.trail.advance(&params);
            let mut projected = self
                .trail
                .points()
                .map(|point| params.project(point, center));
            surface.plot_points(&mut projected, 1.0, base.with_alpha(0.6));
        }

        if inputs.grounding {
            draw_grounding(surface, center, t);
        }

        self.particles
            .step(inputs.state, inputs.heart_rate, center, &mut self.rng);
        surface.set_blend(BlendMode::Lighter);
        for particle in self.particles.particles() {
            surface.fill_circle(
                particle.position,
                particle.radius,
                base.with_alpha(particle.alpha()),
            );
        }

        let color = profile_color(inputs.state);
        if inputs.attunement {
            draw_crystal(surface, center, color, inputs.heart_rate, t);
        } else {
            draw_rings(surface, center, color, base, inputs.heart_rate, t);
        }

        surface.set_alpha(1.0);
        surface.set_shadow(None);
        self.time += 1;
    }
}

fn profile_color(state: AffectState) -> Rgba {
    let (r, g, b) = state.profile().rgb();
    Rgba::rgb(r, g, b)
}

fn draw_grounding(surface: &mut dyn Surface, center: Point, t: f32) {
    surface.set_shadow(Some(Shadow {
        blur: 20.0,
        color: GROUNDING,
    }));
    let max_radius = center.x.min(center.y) * 0.95;
    let radius = max_radius - 20.0 + (t * 0.02).sin() * 10.0;
    surface.stroke_circle(
        center,
        radius,
        Stroke {
            color: GROUNDING,
            width: 4.0,
        },
    );
    surface.set_shadow(None);
}

fn draw_crystal(surface: &mut dyn Surface, center: Point, color: Rgba, heart_rate: f32, t: f32) {
    surface.set_shadow(Some(Shadow { blur: 20.0, color }));
    let radius = 30.0 + (t * 0.05).sin() * (heart_rate / 10.0);
    let points: Vec<Point> = (0..=CRYSTAL_POINTS)
        .map(|i| {
            let angle = i as f32 * TAU / CRYSTAL_POINTS as f32 - FRAC_PI_2;
            let spike = if i % 2 == 0 { 1.0 } else { 0.6 };
            let displacement = spike * radius * (1.0 + (t * 0.1 + i as f32).sin() * 0.1);
            Point::new(
                center.x + angle.cos() * displacement,
                center.y + angle.sin() * displacement,
            )
        })
        .collect();
    surface.polygon(
        &points,
        Some(Stroke { color, width: 1.0 }),
        Some(color.with_alpha(0.2)),
    );
    surface.set_shadow(None);
}

fn draw_rings(
    surface: &mut dyn Surface,
    center: Point,
    color: Rgba,
    base: Rgba,
    heart_rate: f32,
    t: f32,
) {
    surface.set_blend(BlendMode::SourceOver);
    surface.set_shadow(Some(Shadow { blur: 15.0, color }));

    let inner = 60.0 + (t * 0.1).sin() * (heart_rate / 5.0);
    surface.set_alpha(0.6);
    ring_cluster(surface, center, inner, 0.0, Stroke { color, width: 1.5 });

    let outer = 60.0 + (t * 0.1).cos() * (heart_rate / 5.0);
    surface.set_alpha(0.8);
    ring_cluster(
        surface,
        center,
        outer,
        t * 0.005,
        Stroke {
            color: base.with_alpha(0.8),
            width: 2.0,
        },
    );
}

/// A centre circle plus six circles of the same radius on its rim.
fn ring_cluster(surface: &mut dyn Surface, center: Point, radius: f32, rotation: f32, stroke: Stroke) {
    surface.stroke_circle(center, radius, stroke);
    for i in 0..RING_CIRCLES {
        let angle = i as f32 * TAU / RING_CIRCLES as f32 + rotation;
        let rim = Point::new(
            center.x + angle.cos() * radius,
            center.y + angle.sin() * radius,
        );
        surface.stroke_circle(rim, radius, stroke);
    }
}
