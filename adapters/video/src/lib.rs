#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turns a directory of captured battle frames into a length-capped video.
//!
//! Battles short enough to fit play at their native rate. Longer ones keep
//! the first and last fifth at normal speed and compress the middle so the
//! result never exceeds [`VideoConfig::max_seconds`].

mod encoder;
mod remap;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use contraption_core::{frame_file_name, FRAME_FILE_PATTERN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use encoder::{ffmpeg_args, EncodeJob, Encoder, EncodingError, FfmpegEncoder};
pub use remap::{RemapPlan, NORMAL_SPEED_FRACTION};

/// Encoding parameters shared by every battle video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Rate at which captured frames are read, matching the capture rate.
    pub input_frame_rate: u32,
    /// Hard cap on the output length in seconds.
    pub max_seconds: f64,
    /// Captures at most this long are encoded without remapping.
    pub normal_speed_threshold: f64,
    /// Encoder executable.
    pub program: String,
    /// Video codec name.
    pub video_codec: String,
    /// Output pixel format.
    pub pixel_format: String,
    /// Audio codec used when a soundtrack is supplied.
    pub audio_codec: String,
    /// Audio bitrate used when a soundtrack is supplied.
    pub audio_bitrate: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_frame_rate: 30,
            max_seconds: 60.0,
            normal_speed_threshold: 20.0,
            program: String::from("ffmpeg"),
            video_codec: String::from("libx264"),
            pixel_format: String::from("yuv420p"),
            audio_codec: String::from("aac"),
            audio_bitrate: String::from("192k"),
        }
    }
}

impl VideoConfig {
    /// Capture length in seconds of `frames` frames read at the input rate.
    #[must_use]
    pub fn capture_seconds(&self, frames: u32) -> f64 {
        if self.input_frame_rate == 0 {
            return 0.0;
        }
        f64::from(frames) / f64::from(self.input_frame_rate)
    }
}

/// Failures while producing a battle video.
#[derive(Debug, Error)]
pub enum VideoError {
    /// The duration cap leaves no room for the sped-up middle segment.
    #[error("a {total_secs}s battle cannot fit in {max_secs}s: middle target is {target_middle}s")]
    InvalidTimeRemap {
        /// Capture length in seconds.
        total_secs: f64,
        /// Configured output cap in seconds.
        max_secs: f64,
        /// Computed output length of the middle segment.
        target_middle: f64,
    },
    /// Captures allowed to play natively could outlast the cap.
    #[error("normal speed threshold {threshold}s exceeds the {max_secs}s duration cap")]
    ThresholdAboveCap {
        /// Longest capture played at native speed.
        threshold: f64,
        /// Configured output cap in seconds.
        max_secs: f64,
    },
    /// The frame directory does not start with `frame_0.png`.
    #[error("no frames found in {}", dir.display())]
    NoFrames {
        /// Directory that was searched.
        dir: PathBuf,
    },
    /// The encoder failed to run or exited unsuccessfully.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The encoded file could not be inspected.
    #[error("failed to inspect video at {}", path.display())]
    Output {
        /// Path of the expected output.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

/// Result of a successful [`create_video`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoSummary {
    /// Remap applied to the capture.
    pub plan: RemapPlan,
    /// Planned output length in seconds.
    pub output_secs: f64,
    /// Size of the encoded file.
    pub bytes: u64,
}

impl VideoSummary {
    /// Reports whether the encoded file is larger than `limit_bytes`.
    #[must_use]
    pub const fn exceeds(&self, limit_bytes: u64) -> bool {
        self.bytes > limit_bytes
    }
}

/// Encodes the frames in `frame_dir` into `output`.
///
/// `total_secs` is the capture length. The remap is planned and the frame
/// directory checked before `encoder` runs, so infeasible requests never
/// start an encode.
pub fn create_video<E: Encoder + ?Sized>(
    encoder: &mut E,
    frame_dir: &Path,
    total_secs: f64,
    output: &Path,
    audio: Option<&Path>,
    config: &VideoConfig,
) -> Result<VideoSummary, VideoError> {
    let plan = RemapPlan::for_duration(total_secs, config)?;

    if !frame_dir.join(frame_file_name(0)).is_file() {
        return Err(VideoError::NoFrames {
            dir: frame_dir.to_path_buf(),
        });
    }

    let job = EncodeJob {
        frame_pattern: frame_dir.join(FRAME_FILE_PATTERN),
        frame_rate: config.input_frame_rate,
        audio: audio.map(Path::to_path_buf),
        filter: plan.filter(),
        output: output.to_path_buf(),
        video_codec: config.video_codec.clone(),
        pixel_format: config.pixel_format.clone(),
        audio_codec: config.audio_codec.clone(),
        audio_bitrate: config.audio_bitrate.clone(),
    };
    if let RemapPlan::Compressed { speedup, .. } = plan {
        log::debug!("compressing the middle of a {total_secs:.1}s capture by {speedup:.2}x");
    }
    encoder.encode(&job)?;

    let bytes = fs::metadata(output)
        .map_err(|source| VideoError::Output {
            path: output.to_path_buf(),
            source,
        })?
        .len();
    let summary = VideoSummary {
        plan,
        output_secs: plan.output_seconds(),
        bytes,
    };
    log::info!(
        "encoded {} ({:.1}s, {} bytes)",
        output.display(),
        summary.output_secs,
        summary.bytes
    );
    Ok(summary)
}
