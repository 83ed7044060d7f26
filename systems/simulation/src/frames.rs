//! Frame persistence and delivery.

use std::{
    fs,
    path::{Path, PathBuf},
};

use contraption_core::{frame_file_name, Frame};

use crate::error::{SimulationError, SinkError};

/// Consumer notified synchronously of every captured frame.
///
/// The simulation waits for each call to return before stepping again, so a
/// slow consumer slows the battle down and an error stops it.
pub trait FrameSink {
    /// Receives a frame together with the fraction of the battle completed.
    fn deliver(&mut self, frame: &Frame, progress: f32) -> Result<(), SinkError>;
}

impl<F> FrameSink for F
where
    F: FnMut(&Frame, f32) -> Result<(), SinkError>,
{
    fn deliver(&mut self, frame: &Frame, progress: f32) -> Result<(), SinkError> {
        self(frame, progress)
    }
}

/// Sink that ignores every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardFrames;

impl FrameSink for DiscardFrames {
    fn deliver(&mut self, _frame: &Frame, _progress: f32) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes frames as `frame_<n>.png` with contiguous indices.
#[derive(Debug)]
pub(crate) struct FrameStore<'a> {
    directory: &'a Path,
    written: u32,
}

impl<'a> FrameStore<'a> {
    pub(crate) fn new(directory: &'a Path) -> Self {
        Self {
            directory,
            written: 0,
        }
    }

    /// Persists `frame` under the next free index and returns that index.
    pub(crate) fn write(&mut self, frame: &Frame) -> Result<u32, SimulationError> {
        let index = self.written;
        let path: PathBuf = self.directory.join(frame_file_name(index));
        fs::write(&path, frame.png_bytes())
            .map_err(|source| SimulationError::FrameIo { path, source })?;
        self.written += 1;
        Ok(index)
    }

    pub(crate) fn written(&self) -> u32 {
        self.written
    }
}
