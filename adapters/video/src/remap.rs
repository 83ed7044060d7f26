//! Three-segment time remap fitting long battles under the duration cap.

use crate::{VideoConfig, VideoError};

/// Fraction of the battle kept at normal speed at the start and at the end.
pub const NORMAL_SPEED_FRACTION: f64 = 0.2;

/// How a capture of a given length is mapped onto the output video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RemapPlan {
    /// Every frame plays at its native rate.
    Native {
        /// Output length in seconds.
        duration: f64,
    },
    /// Head and tail play normally while the middle is sped up.
    Compressed {
        /// Seconds kept at normal speed at the start.
        head: f64,
        /// Capture time from which the tail plays at normal speed.
        tail_start: f64,
        /// Output length of the sped-up middle.
        target_middle: f64,
        /// Playback speed factor of the middle.
        speedup: f64,
    },
}

impl RemapPlan {
    /// Plans the remap for a capture lasting `total_secs`.
    ///
    /// Captures short enough to play natively are returned as
    /// [`RemapPlan::Native`]. Longer ones are rejected when the cap leaves no
    /// room for the middle segment. A threshold above the cap is rejected
    /// whatever the capture length.
    pub fn for_duration(total_secs: f64, config: &VideoConfig) -> Result<Self, VideoError> {
        if config.normal_speed_threshold > config.max_seconds {
            return Err(VideoError::ThresholdAboveCap {
                threshold: config.normal_speed_threshold,
                max_secs: config.max_seconds,
            });
        }
        if total_secs <= config.normal_speed_threshold {
            return Ok(Self::Native {
                duration: total_secs,
            });
        }

        let head = total_secs * NORMAL_SPEED_FRACTION;
        let tail_start = total_secs * (1.0 - NORMAL_SPEED_FRACTION);
        let middle = tail_start - head;
        let target_middle = config.max_seconds - 2.0 * head;
        if target_middle <= 0.0 {
            return Err(VideoError::InvalidTimeRemap {
                total_secs,
                max_secs: config.max_seconds,
                target_middle,
            });
        }

        Ok(Self::Compressed {
            head,
            tail_start,
            target_middle,
            speedup: middle / target_middle,
        })
    }

    /// Length of the encoded video in seconds.
    #[must_use]
    pub fn output_seconds(&self) -> f64 {
        match *self {
            Self::Native { duration } => duration,
            Self::Compressed {
                head,
                target_middle,
                ..
            } => 2.0 * head + target_middle,
        }
    }

    /// Filter graph applying the remap, or `None` for native playback.
    ///
    /// The graph exposes its result as `[outv]`.
    #[must_use]
    pub fn filter(&self) -> Option<String> {
        match *self {
            Self::Native { .. } => None,
            Self::Compressed {
                head,
                tail_start,
                speedup,
                ..
            } => Some(format!(
                "[0:v]split=3[s1][s2][s3];\
                 [s1]trim=0:{head},setpts=PTS-STARTPTS[v1];\
                 [s2]trim={head}:{tail_start},setpts={factor}*(PTS-STARTPTS)[v2];\
                 [s3]trim={tail_start},setpts=PTS-STARTPTS[v3];\
                 [v1][v2][v3]concat=n=3:v=1[outv]",
                factor = 1.0 / speedup,
            )),
        }
    }
}
