//! Battle pipeline: simulate into a scratch directory, then encode the video.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context, Result};
use contraption_core::Frame;
use contraption_physics_rapier::RapierWorld;
use contraption_rendering::{load_font, SceneRenderer, SpriteAtlas};
use contraption_system_builder::BuildGrid;
use contraption_system_simulation::{run_simulation, FrameSink, SimulationReport, SinkError};
use contraption_video::{create_video, FfmpegEncoder, VideoSummary};

use crate::config::BattleConfig;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
const SCRATCH_ATTEMPTS: u32 = 16;

/// Private frame directory removed when dropped, whatever the outcome of the run.
#[derive(Debug)]
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub(crate) fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create scratch root {}", root.display()))?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();

        for attempt in 0..SCRATCH_ATTEMPTS {
            let path = root.join(format!(
                "contraption-{}-{stamp}-{attempt}",
                std::process::id()
            ));
            match fs::create_dir(&path) {
                Ok(()) => {
                    log::debug!("writing frames to {}", path.display());
                    return Ok(Self { path });
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(error) => {
                    return Err(error).with_context(|| {
                        format!("failed to create scratch directory {}", path.display())
                    });
                }
            }
        }
        bail!("no free scratch directory name under {}", root.display())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir_all(&self.path) {
            log::warn!(
                "failed to remove scratch directory {}: {error}",
                self.path.display()
            );
        }
    }
}

/// Frame sink reporting progress at most once per interval.
///
/// When a preview path is set the latest reported frame is also written there.
#[derive(Debug)]
pub(crate) struct ProgressSink {
    interval: Duration,
    last_report: Option<Instant>,
    preview: Option<PathBuf>,
}

impl ProgressSink {
    pub(crate) fn new(interval: Duration, preview: Option<PathBuf>) -> Self {
        Self {
            interval,
            last_report: None,
            preview,
        }
    }
}

impl FrameSink for ProgressSink {
    fn deliver(&mut self, frame: &Frame, progress: f32) -> Result<(), SinkError> {
        let now = Instant::now();
        let due = progress >= 1.0
            || self
                .last_report
                .map_or(true, |last| now.duration_since(last) >= self.interval);
        if !due {
            return Ok(());
        }
        self.last_report = Some(now);

        log::info!("simulating: {:>3.0}%", progress * 100.0);
        if let Some(path) = &self.preview {
            fs::write(path, frame.png_bytes()).map_err(SinkError::new)?;
        }
        Ok(())
    }
}

/// Everything the caller needs to know about a finished battle.
#[derive(Debug)]
pub(crate) struct BattleSummary {
    pub(crate) report: SimulationReport,
    pub(crate) video: VideoSummary,
    pub(crate) oversized: bool,
}

/// Files a battle reads and writes besides the configuration.
#[derive(Debug)]
pub(crate) struct BattleFiles<'a> {
    pub(crate) output: &'a Path,
    pub(crate) audio: Option<&'a Path>,
    pub(crate) preview: Option<&'a Path>,
}

/// Simulates `green` against `purple` and encodes the result into `files.output`.
pub(crate) fn run_battle(
    green: &BuildGrid,
    purple: &BuildGrid,
    files: &BattleFiles<'_>,
    config: &BattleConfig,
) -> Result<BattleSummary> {
    green
        .validate_for_battle()
        .context("green contraption cannot battle")?;
    purple
        .validate_for_battle()
        .context("purple contraption cannot battle")?;
    let _ = config.validate()?;
    if let Some(audio) = files.audio {
        if !audio.is_file() {
            bail!("audio track {} does not exist", audio.display());
        }
    }

    let mut renderer = build_renderer(config)?;
    let scratch = ScratchDir::create(&config.output.scratch_root())?;
    let sink = ProgressSink::new(PROGRESS_INTERVAL, files.preview.map(Path::to_path_buf));

    let report = run_simulation(
        green,
        purple,
        RapierWorld::default(),
        &mut renderer,
        &config.simulation,
        scratch.path(),
        sink,
    )
    .context("battle simulation failed")?;
    if report.debris_spawned > 0 {
        log::debug!("{} debris bodies fell", report.debris_spawned);
    }

    let mut encoder = FfmpegEncoder::new(config.video.program.as_str());
    let total_secs = config.video.capture_seconds(report.frames_written);
    let video = create_video(
        &mut encoder,
        scratch.path(),
        total_secs,
        files.output,
        files.audio,
        &config.video,
    )
    .with_context(|| format!("failed to encode {}", files.output.display()))?;

    let limit = config.output.max_upload_bytes();
    let oversized = video.exceeds(limit);
    if oversized {
        log::warn!(
            "{} is {} bytes, above the {} MB upload limit",
            files.output.display(),
            video.bytes,
            config.output.max_upload_mb
        );
    }
    Ok(BattleSummary {
        report,
        video,
        oversized,
    })
}

fn build_renderer(config: &BattleConfig) -> Result<SceneRenderer> {
    let mut renderer = SceneRenderer::new(config.simulation.layout);
    if let Some(manifest) = &config.rendering.sprite_manifest {
        let atlas = SpriteAtlas::from_manifest_path(manifest)
            .with_context(|| format!("failed to load sprites from {}", manifest.display()))?;
        log::debug!("loaded sprites from {}", manifest.display());
        renderer = renderer.with_atlas(atlas);
    }
    if let Some(font) = &config.rendering.caption_font {
        renderer = renderer.with_font(load_font(font)?);
    }
    Ok(renderer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("contraption-cli-{name}-{}", std::process::id()))
    }

    #[test]
    fn scratch_directory_is_removed_on_drop() {
        let root = scratch_root("scratch");
        let path = {
            let scratch = ScratchDir::create(&root).expect("scratch created");
            fs::write(scratch.path().join("frame_0.png"), b"png").expect("frame written");
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());

        let first = ScratchDir::create(&root).expect("first scratch");
        let second = ScratchDir::create(&root).expect("second scratch");
        assert_ne!(first.path(), second.path());
        drop((first, second));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn progress_is_throttled_but_completion_always_reported() {
        let root = scratch_root("preview");
        fs::create_dir_all(&root).expect("root created");
        let preview = root.join("preview.png");
        let frame = Frame::from_png(1, 1, b"frame".to_vec());
        let mut sink = ProgressSink::new(Duration::from_secs(3600), Some(preview.clone()));

        sink.deliver(&frame, 0.0).expect("first delivery");
        assert_eq!(fs::read(&preview).expect("preview written"), b"frame");

        fs::remove_file(&preview).expect("preview removed");
        sink.deliver(&frame, 0.5).expect("throttled delivery");
        assert!(!preview.exists(), "throttled frames are not written");

        sink.deliver(&frame, 1.0).expect("final delivery");
        assert!(preview.exists(), "completion is always reported");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn preview_write_failure_stops_the_run() {
        let missing = scratch_root("missing-preview").join("nested").join("preview.png");
        let mut sink = ProgressSink::new(PROGRESS_INTERVAL, Some(missing));
        let frame = Frame::from_png(1, 1, Vec::new());
        assert!(sink.deliver(&frame, 0.0).is_err());
    }

    #[test]
    fn battles_without_players_are_rejected_before_simulating() {
        let root = scratch_root("no-player");
        let mut config = BattleConfig::default();
        config.output.scratch_root = Some(root.clone());
        let files = BattleFiles {
            output: Path::new("never-written.mp4"),
            audio: None,
            preview: None,
        };

        let error = run_battle(&BuildGrid::new(), &BuildGrid::new(), &files, &config)
            .expect_err("missing player rejected");
        assert!(format!("{error:#}").contains("no player"), "{error:#}");
        assert!(!root.exists(), "no scratch directory created");
    }
}
