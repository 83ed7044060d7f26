//! Falling hazards whose mass and speed escalate over the battle.

use contraption_core::{ArenaLayout, BodyCategory, BodySpec, Shape};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::DebrisConfig;

/// Linear growth of debris mass and downward speed over elapsed battle time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebrisEscalation {
    mass_start: f32,
    mass_end: f32,
    velocity_start: f32,
    velocity_end: f32,
}

impl DebrisEscalation {
    /// Creates an escalation curve between explicit endpoints.
    #[must_use]
    pub const fn new(
        mass_start: f32,
        mass_end: f32,
        velocity_start: f32,
        velocity_end: f32,
    ) -> Self {
        Self {
            mass_start,
            mass_end,
            velocity_start,
            velocity_end,
        }
    }

    /// Extracts the escalation curve from a debris configuration.
    #[must_use]
    pub const fn from_config(config: &DebrisConfig) -> Self {
        Self::new(
            config.mass_start,
            config.mass_end,
            config.velocity_start,
            config.velocity_end,
        )
    }

    /// Mass of debris spawned at battle `fraction`, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn mass_at(&self, fraction: f32) -> f32 {
        lerp(self.mass_start, self.mass_end, fraction)
    }

    /// Downward speed of debris spawned at battle `fraction`, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn velocity_at(&self, fraction: f32) -> f32 {
        lerp(self.velocity_start, self.velocity_end, fraction)
    }
}

fn lerp(start: f32, end: f32, fraction: f32) -> f32 {
    let fraction = fraction.clamp(0.0, 1.0);
    start + (end - start) * fraction
}

/// Decides when debris falls and where.
#[derive(Debug)]
pub(crate) struct DebrisSpawner {
    every_steps: u32,
    escalation: DebrisEscalation,
    config: DebrisConfig,
    rng: ChaCha8Rng,
}

impl DebrisSpawner {
    pub(crate) fn new(config: DebrisConfig, every_steps: u32, rng: ChaCha8Rng) -> Self {
        Self {
            every_steps: every_steps.max(1),
            escalation: DebrisEscalation::from_config(&config),
            config,
            rng,
        }
    }

    /// Whether a piece of debris falls on `step`. The first one falls on step zero.
    pub(crate) fn is_due(&self, step: u32) -> bool {
        step % self.every_steps == 0
    }

    /// Body description of the next piece of debris at battle `fraction`.
    pub(crate) fn next(&mut self, fraction: f32, layout: &ArenaLayout) -> BodySpec {
        let margin = self.config.margin;
        let x = self.rng.gen_range(margin..layout.width - margin);
        let jitter = self.config.horizontal_jitter;
        let vx = if jitter > 0.0 {
            self.rng.gen_range(-jitter..jitter)
        } else {
            0.0
        };
        let edge = layout.cell_size * self.config.size_ratio;

        BodySpec::new(
            Shape::Rect {
                width: edge,
                height: edge,
            },
            Vec2::new(x, self.config.spawn_height),
            BodyCategory::Debris,
        )
        .with_mass(self.escalation.mass_at(fraction))
        .with_velocity(Vec2::new(vx, self.escalation.velocity_at(fraction)))
        .with_restitution(self.config.restitution)
    }
}
