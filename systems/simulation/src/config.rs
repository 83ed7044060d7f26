//! Tuning knobs for a battle simulation.

use contraption_core::ArenaLayout;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregated tuning knobs controlling every adjustable aspect of a battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated battle length in seconds.
    pub duration_secs: f32,
    /// Fixed steps per simulated second; one frame is captured per step.
    pub frame_rate: u32,
    /// Arena geometry shared with the assembler and renderer.
    pub layout: ArenaLayout,
    /// Horizontal distance of each team's build area from the arena centre.
    pub team_offset: f32,
    /// Torque applied to every wheel each step; green spins positive, purple negative.
    pub wheel_torque: f32,
    /// Weld anchor separation, as a fraction of the cell size, at which a weld snaps.
    pub weld_break_ratio: f32,
    /// Stiffness of spring links.
    pub spring_stiffness: f32,
    /// Damping of spring links.
    pub spring_damping: f32,
    /// Falling hazard tuning.
    pub debris: DebrisConfig,
    /// Seed for debris placement; `None` draws one from the operating system.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 90.0,
            frame_rate: 30,
            layout: ArenaLayout::default(),
            team_offset: 200.0,
            wheel_torque: 2.0,
            weld_break_ratio: 0.02,
            spring_stiffness: 40.0,
            spring_damping: 1.0,
            debris: DebrisConfig::default(),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Number of fixed steps in a full-length battle.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        (self.duration_secs * self.frame_rate as f32).round() as u32
    }

    /// Length of one fixed step in seconds.
    #[must_use]
    pub fn timestep(&self) -> f32 {
        1.0 / self.frame_rate as f32
    }

    /// Anchor separation in world units beyond which welds break.
    #[must_use]
    pub fn weld_break_distance(&self) -> f32 {
        self.layout.cell_size * self.weld_break_ratio
    }

    /// Number of steps between two debris spawns, never less than one.
    #[must_use]
    pub fn debris_interval_steps(&self) -> u32 {
        ((self.debris.interval_secs * self.frame_rate as f32).round() as u32).max(1)
    }

    /// Rejects configurations the simulator cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if !(self.duration_secs > 0.0) || self.total_steps() == 0 {
            return Err(ConfigError::NonPositiveDuration {
                duration_secs: self.duration_secs,
            });
        }
        if !(self.debris.interval_secs > 0.0) {
            return Err(ConfigError::NonPositiveDebrisInterval {
                interval_secs: self.debris.interval_secs,
            });
        }
        if self.debris.margin * 2.0 >= self.layout.width {
            return Err(ConfigError::DebrisMarginTooWide {
                margin: self.debris.margin,
                width: self.layout.width,
            });
        }
        if !(self.layout.cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize {
                cell_size: self.layout.cell_size,
            });
        }
        Ok(())
    }
}

/// Debris spawn cadence and escalation curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebrisConfig {
    /// Seconds between two spawns.
    pub interval_secs: f32,
    /// Mass of debris spawned at the start of the battle.
    pub mass_start: f32,
    /// Mass of debris spawned at the very end of the battle.
    pub mass_end: f32,
    /// Downward speed, in world units per second, at the start of the battle.
    pub velocity_start: f32,
    /// Downward speed, in world units per second, at the end of the battle.
    pub velocity_end: f32,
    /// Largest horizontal speed applied as random jitter in either direction.
    pub horizontal_jitter: f32,
    /// Debris edge length as a fraction of the cell size.
    pub size_ratio: f32,
    /// Vertical spawn position; negative values start above the visible arena.
    pub spawn_height: f32,
    /// Horizontal distance from each arena edge that spawns avoid.
    pub margin: f32,
    /// Bounciness of debris.
    pub restitution: f32,
}

impl Default for DebrisConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            mass_start: 5.0,
            mass_end: 100.0,
            velocity_start: 300.0,
            velocity_end: 1_500.0,
            horizontal_jitter: 120.0,
            size_ratio: 0.8,
            spawn_height: -50.0,
            margin: 50.0,
            restitution: 0.1,
        }
    }
}

/// Reasons a simulation configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No steps per second were requested.
    #[error("frame_rate must be positive")]
    ZeroFrameRate,
    /// The battle would not run a single step.
    #[error("duration_secs must be positive (received {duration_secs})")]
    NonPositiveDuration {
        /// Rejected duration.
        duration_secs: f32,
    },
    /// Debris would spawn every instant.
    #[error("debris interval_secs must be positive (received {interval_secs})")]
    NonPositiveDebrisInterval {
        /// Rejected interval.
        interval_secs: f32,
    },
    /// No horizontal room remains for spawning debris.
    #[error("debris margin {margin} leaves no room in an arena {width} wide")]
    DebrisMarginTooWide {
        /// Rejected margin.
        margin: f32,
        /// Arena width.
        width: f32,
    },
    /// Grid cells would have no extent.
    #[error("cell_size must be positive (received {cell_size})")]
    NonPositiveCellSize {
        /// Rejected cell size.
        cell_size: f32,
    },
}
