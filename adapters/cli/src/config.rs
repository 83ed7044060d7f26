//! Battle configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use contraption_system_simulation::SimulationConfig;
use contraption_video::{RemapPlan, VideoConfig};
use serde::{Deserialize, Serialize};

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Every knob of the battle pipeline. Missing sections use their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BattleConfig {
    pub(crate) simulation: SimulationConfig,
    pub(crate) video: VideoConfig,
    pub(crate) rendering: RenderingConfig,
    pub(crate) output: OutputConfig,
}

/// Optional assets for the frame renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RenderingConfig {
    /// Sprite manifest; placeholders are drawn when absent.
    pub(crate) sprite_manifest: Option<PathBuf>,
    /// Caption font for the victory overlay; battles are refused without one.
    pub(crate) caption_font: Option<PathBuf>,
}

/// Where scratch frames live and how large the result may be.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OutputConfig {
    /// Parent of the per-run scratch directory; the system temp dir when unset.
    pub(crate) scratch_root: Option<PathBuf>,
    /// Size above which the finished video is reported as too large to upload.
    pub(crate) max_upload_mb: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scratch_root: None,
            max_upload_mb: 10,
        }
    }
}

impl OutputConfig {
    pub(crate) fn scratch_root(&self) -> PathBuf {
        self.scratch_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub(crate) const fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(BYTES_PER_MEGABYTE)
    }
}

impl BattleConfig {
    /// Reads the configuration at `path`, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse battle config")
    }

    /// Rejects configurations that would fail after the simulation has run.
    pub(crate) fn validate(&self) -> Result<RemapPlan> {
        self.simulation.validate()?;
        ensure!(
            self.rendering.caption_font.is_some(),
            "no caption font configured; set `caption_font` under [rendering] to name the winner"
        );
        if self.video.input_frame_rate != self.simulation.frame_rate {
            log::warn!(
                "video input rate {} fps differs from the {} fps capture rate",
                self.video.input_frame_rate,
                self.simulation.frame_rate
            );
        }
        let nominal = self.video.capture_seconds(self.simulation.total_steps());
        RemapPlan::for_duration(nominal, &self.video)
            .context("a full-length battle would not fit the video duration cap")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = BattleConfig::parse("").expect("empty config parses");
        assert_eq!(config, BattleConfig::default());
        assert_eq!(config.output.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(config.rendering.caption_font.is_none());
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = BattleConfig::parse(
            r#"
            [simulation]
            duration_secs = 30.0
            seed = 7

            [simulation.debris]
            interval_secs = 1.0

            [video]
            max_seconds = 45.0

            [rendering]
            caption_font = "assets/fonts/caption.ttf"

            [output]
            scratch_root = "/var/tmp/battles"
            max_upload_mb = 25
            "#,
        )
        .expect("config parses");

        assert_eq!(config.simulation.duration_secs, 30.0);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.debris.interval_secs, 1.0);
        assert_eq!(config.simulation.frame_rate, 30);
        assert_eq!(config.video.max_seconds, 45.0);
        assert_eq!(config.video.program, "ffmpeg");
        assert_eq!(
            config.rendering.caption_font.as_deref(),
            Some(Path::new("assets/fonts/caption.ttf"))
        );
        assert_eq!(config.output.scratch_root(), PathBuf::from("/var/tmp/battles"));
        assert_eq!(config.output.max_upload_bytes(), 25 * 1024 * 1024);
    }

    fn with_font() -> BattleConfig {
        let mut config = BattleConfig::default();
        config.rendering.caption_font = Some(PathBuf::from("caption.ttf"));
        config
    }

    #[test]
    fn default_battle_fits_the_default_cap() {
        let plan = with_font().validate().expect("defaults are valid");
        assert!((plan.output_seconds() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn battles_need_a_caption_font() {
        let error = BattleConfig::default().validate().expect_err("font required");
        assert!(error.to_string().contains("caption_font"), "{error}");
    }

    #[test]
    fn infeasible_cap_is_rejected_up_front() {
        let mut config = with_font();
        config.video.max_seconds = 30.0;
        assert!(config.validate().is_err());

        let mut config = with_font();
        config.video.max_seconds = 10.0;
        assert!(config.validate().is_err(), "cap below the native threshold");

        let mut config = with_font();
        config.simulation.frame_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_field_types_are_reported() {
        assert!(BattleConfig::parse("[simulation]\nframe_rate = \"fast\"").is_err());
    }
}
