//! Video encoder port and its ffmpeg implementation.

use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Command, Stdio},
};

use thiserror::Error;

/// Number of trailing stderr lines kept in encoder diagnostics.
const STDERR_TAIL_LINES: usize = 12;

/// Everything an encoder needs to turn frame files into a video.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeJob {
    /// printf-style path matching every frame file.
    pub frame_pattern: PathBuf,
    /// Rate at which input frames are read.
    pub frame_rate: u32,
    /// Optional soundtrack muxed alongside the video.
    pub audio: Option<PathBuf>,
    /// Optional filter graph producing an `[outv]` stream.
    pub filter: Option<String>,
    /// Destination video file.
    pub output: PathBuf,
    /// Video codec name.
    pub video_codec: String,
    /// Output pixel format.
    pub pixel_format: String,
    /// Audio codec name, used when `audio` is set.
    pub audio_codec: String,
    /// Audio bitrate, used when `audio` is set.
    pub audio_bitrate: String,
}

/// Failure to produce a video, whether the tool could not start or exited non-zero.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("video encoding failed: {message}")]
pub struct EncodingError {
    message: String,
}

impl EncodingError {
    /// Creates an error carrying the available diagnostic.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Diagnostic message, including the exit code or availability problem.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Capability turning a prepared job into a video file.
pub trait Encoder {
    /// Runs the job to completion.
    fn encode(&mut self, job: &EncodeJob) -> Result<(), EncodingError>;
}

/// [`Encoder`] invoking an ffmpeg-compatible executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegEncoder {
    program: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    /// Creates an encoder running `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Executable this encoder runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&mut self, job: &EncodeJob) -> Result<(), EncodingError> {
        let args = ffmpeg_args(job);
        log::debug!("running {} with {} arguments", self.program, args.len());

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|error| {
                EncodingError::new(format!("{} unavailable: {error}", self.program))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines = stderr.lines().collect::<Vec<_>>();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        let code = output
            .status
            .code()
            .map_or_else(|| String::from("a signal"), |code| format!("code {code}"));
        Err(EncodingError::new(format!(
            "{} exited with {code}: {tail}",
            self.program
        )))
    }
}

/// Command-line arguments that make ffmpeg run `job`.
#[must_use]
pub fn ffmpeg_args(job: &EncodeJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-framerate".into(),
        job.frame_rate.to_string().into(),
        "-i".into(),
        job.frame_pattern.clone().into(),
    ];
    if let Some(audio) = &job.audio {
        args.push("-i".into());
        args.push(audio.clone().into());
    }

    match (&job.filter, &job.audio) {
        (Some(filter), _) => {
            args.push("-filter_complex".into());
            args.push(filter.into());
            args.push("-map".into());
            args.push("[outv]".into());
        }
        (None, Some(_)) => {
            args.push("-map".into());
            args.push("0:v".into());
        }
        (None, None) => {}
    }
    if job.audio.is_some() {
        args.push("-map".into());
        args.push("1:a".into());
    }

    args.push("-c:v".into());
    args.push((&job.video_codec).into());
    args.push("-pix_fmt".into());
    args.push((&job.pixel_format).into());
    if job.audio.is_some() {
        args.push("-c:a".into());
        args.push((&job.audio_codec).into());
        args.push("-b:a".into());
        args.push((&job.audio_bitrate).into());
        args.push("-shortest".into());
    }
    args.push(job.output.clone().into());
    args
}
