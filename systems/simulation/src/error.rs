//! Failures that abort a battle.

use std::{error::Error as StdError, io, path::PathBuf};

use contraption_core::{PhysicsError, RenderError};
use thiserror::Error;

use crate::config::ConfigError;

/// Failure reported by a frame sink, which stops the simulation.
#[derive(Debug, Error)]
#[error("frame consumer failed: {source}")]
pub struct SinkError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl SinkError {
    /// Wraps the consumer's own error.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Errors that stop a battle before it completes.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration cannot be simulated.
    #[error("invalid simulation configuration")]
    Config(#[from] ConfigError),
    /// A build grid has no player.
    #[error("{team} team has no player")]
    MissingPlayer {
        /// Label of the offending team.
        team: &'static str,
    },
    /// The physics backend failed.
    #[error("physics step failed")]
    Physics(#[from] PhysicsError),
    /// A frame could not be rendered.
    #[error("frame rendering failed")]
    Render(#[from] RenderError),
    /// A frame could not be written to disk.
    #[error("failed to write frame {path}")]
    FrameIo {
        /// Destination of the frame.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The frame consumer asked to stop.
    #[error(transparent)]
    Sink(#[from] SinkError),
}
