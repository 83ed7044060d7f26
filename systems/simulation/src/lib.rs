#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step battle simulator driving two assembled contraptions.
//!
//! The simulator owns no physics engine or rasteriser of its own. It talks to
//! a [`contraption_core::PhysicsWorld`] and a [`contraption_core::FrameRenderer`]
//! supplied by the caller, writes one `frame_<n>.png` per step and reports
//! each frame to a blocking [`FrameSink`].

mod config;
mod debris;
mod error;
mod frames;
mod run;
mod welds;

pub use config::{ConfigError, DebrisConfig, SimulationConfig};
pub use debris::DebrisEscalation;
pub use error::{SimulationError, SinkError};
pub use frames::{DiscardFrames, FrameSink};
pub use run::{run_simulation, SimulationOutcome, SimulationReport, SimulationState};
pub use welds::{break_stretched_welds, ActiveWeld};
