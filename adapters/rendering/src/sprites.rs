//! Part artwork keyed by role, optionally loaded from a TOML manifest.
//!
//! A manifest names one PNG per [`SpriteKey`], relative to the manifest file:
//!
//! ```toml
//! version = 1
//!
//! [sprites]
//! Box = "parts/box.png"
//! Wheel = "parts/wheel.png"
//! Spring = "parts/spring.png"
//! GreenPlayer = "players/green.png"
//! PurplePlayer = "players/purple.png"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use contraption_core::{BodyCategory, Team};
use image::{ImageFormat, RgbaImage};
use serde::Deserialize;

const MANIFEST_VERSION: u32 = 1;

/// Sprites every atlas must provide, in storage order.
pub const ALL_SPRITE_KEYS: [SpriteKey; 5] = [
    SpriteKey::Box,
    SpriteKey::Wheel,
    SpriteKey::Spring,
    SpriteKey::GreenPlayer,
    SpriteKey::PurplePlayer,
];

/// Identifies one artwork in the sprite atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    /// Structural block.
    Box,
    /// Motorised wheel.
    Wheel,
    /// Spring link, stretched between its endpoints.
    Spring,
    /// Green team's pilot.
    GreenPlayer,
    /// Purple team's pilot.
    PurplePlayer,
}

impl SpriteKey {
    /// Sprite drawn for a body of `category` owned by `team`, if it has one.
    #[must_use]
    pub const fn for_body(category: BodyCategory, team: Option<Team>) -> Option<Self> {
        match (category, team) {
            (BodyCategory::Box, _) => Some(Self::Box),
            (BodyCategory::Wheel, _) => Some(Self::Wheel),
            (BodyCategory::Player, Some(Team::Green)) => Some(Self::GreenPlayer),
            (BodyCategory::Player, Some(Team::Purple)) => Some(Self::PurplePlayer),
            _ => None,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Box => 0,
            Self::Wheel => 1,
            Self::Spring => 2,
            Self::GreenPlayer => 3,
            Self::PurplePlayer => 4,
        }
    }
}

/// One decoded image per [`SpriteKey`].
#[derive(Debug)]
pub struct SpriteAtlas {
    images: Vec<RgbaImage>,
}

impl SpriteAtlas {
    /// Loads every sprite named by the manifest at `path`.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read sprite manifest {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let sources = manifest_sources(&text, base)?;
        Self::load(sources, decode_png)
    }

    /// Builds an atlas from decoded images, which must name every key exactly once.
    pub fn from_images(images: impl IntoIterator<Item = (SpriteKey, RgbaImage)>) -> Result<Self> {
        let mut slots: [Option<RgbaImage>; 5] = Default::default();
        for (key, image) in images {
            ensure!(
                slots[key.slot()].replace(image).is_none(),
                "sprite {key:?} given twice"
            );
        }
        let mut images = Vec::with_capacity(slots.len());
        for (key, slot) in ALL_SPRITE_KEYS.into_iter().zip(slots) {
            let Some(image) = slot else {
                bail!("no sprite given for {key:?}");
            };
            images.push(image);
        }
        Ok(Self { images })
    }

    /// Image registered for `key`.
    #[must_use]
    pub fn image(&self, key: SpriteKey) -> Option<&RgbaImage> {
        self.images.get(key.slot())
    }

    fn load(
        sources: Vec<(SpriteKey, PathBuf)>,
        mut decode: impl FnMut(&Path) -> Result<RgbaImage>,
    ) -> Result<Self> {
        let images = sources
            .into_iter()
            .map(|(key, path)| {
                decode(&path)
                    .with_context(|| {
                        format!("failed to load {key:?} sprite from {}", path.display())
                    })
                    .map(|image| (key, image))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_images(images)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpriteManifest {
    version: u32,
    sprites: SpritePaths,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
struct SpritePaths {
    #[serde(rename = "Box")]
    block: PathBuf,
    wheel: PathBuf,
    spring: PathBuf,
    green_player: PathBuf,
    purple_player: PathBuf,
}

/// Resolves the manifest into sprite sources, relative to `base`, in [`ALL_SPRITE_KEYS`] order.
fn manifest_sources(text: &str, base: &Path) -> Result<Vec<(SpriteKey, PathBuf)>> {
    let manifest: SpriteManifest = toml::from_str(text).context("malformed sprite manifest")?;
    ensure!(
        manifest.version == MANIFEST_VERSION,
        "sprite manifest version {} is not supported, expected {MANIFEST_VERSION}",
        manifest.version
    );
    let SpritePaths {
        block,
        wheel,
        spring,
        green_player,
        purple_player,
    } = manifest.sprites;
    Ok([block, wheel, spring, green_player, purple_player]
        .into_iter()
        .zip(ALL_SPRITE_KEYS)
        .map(|(path, key)| (key, base.join(path)))
        .collect())
}

fn decode_png(path: &Path) -> Result<RgbaImage> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .with_context(|| format!("{} is not a PNG", path.display()))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        version = 1

        [sprites]
        PurplePlayer = "players/purple.png"
        Spring = "parts/spring.png"
        Box = "parts/box.png"
        GreenPlayer = "players/green.png"
        Wheel = "parts/wheel.png"
    "#;

    #[test]
    fn sources_resolve_next_to_the_manifest() {
        let sources = manifest_sources(FULL, Path::new("art")).expect("manifest parses");
        assert_eq!(
            sources,
            vec![
                (SpriteKey::Box, PathBuf::from("art/parts/box.png")),
                (SpriteKey::Wheel, PathBuf::from("art/parts/wheel.png")),
                (SpriteKey::Spring, PathBuf::from("art/parts/spring.png")),
                (SpriteKey::GreenPlayer, PathBuf::from("art/players/green.png")),
                (SpriteKey::PurplePlayer, PathBuf::from("art/players/purple.png")),
            ]
        );
    }

    #[test]
    fn incomplete_or_unknown_entries_are_rejected() {
        let missing = FULL.replace("Wheel = \"parts/wheel.png\"", "");
        assert!(manifest_sources(&missing, Path::new("art")).is_err());

        let extra = format!("{FULL}\nDebris = \"debris.png\"\n");
        assert!(manifest_sources(&extra, Path::new("art")).is_err());

        let future = FULL.replace("version = 1", "version = 2");
        let error = manifest_sources(&future, Path::new("art")).expect_err("version rejected");
        assert!(error.to_string().contains("version 2"), "{error}");
    }

    #[test]
    fn load_failures_name_the_sprite() {
        let sources = vec![(SpriteKey::Wheel, PathBuf::from("missing.png"))];
        let error = SpriteAtlas::load(sources, |_| bail!("gone")).expect_err("decode fails");
        assert!(format!("{error:#}").contains("Wheel"), "{error:#}");
    }

    #[test]
    fn images_are_stored_per_key() {
        let atlas = SpriteAtlas::load(
            manifest_sources(FULL, Path::new("art")).expect("manifest parses"),
            |path| {
                let width = path.to_string_lossy().len() as u32;
                Ok(RgbaImage::new(width, 1))
            },
        )
        .expect("atlas loads");
        let width = |key| atlas.image(key).map(RgbaImage::width);
        assert_eq!(width(SpriteKey::Box), Some("art/parts/box.png".len() as u32));
        assert_eq!(
            width(SpriteKey::PurplePlayer),
            Some("art/players/purple.png".len() as u32)
        );
    }

    #[test]
    fn duplicate_images_are_rejected() {
        let images = ALL_SPRITE_KEYS
            .into_iter()
            .chain([SpriteKey::Box])
            .map(|key| (key, RgbaImage::new(1, 1)));
        assert!(SpriteAtlas::from_images(images).is_err());
    }

    #[test]
    fn bodies_map_to_team_sprites() {
        assert_eq!(
            SpriteKey::for_body(BodyCategory::Player, Some(Team::Purple)),
            Some(SpriteKey::PurplePlayer)
        );
        assert_eq!(
            SpriteKey::for_body(BodyCategory::Wheel, Some(Team::Green)),
            Some(SpriteKey::Wheel)
        );
        assert_eq!(SpriteKey::for_body(BodyCategory::Debris, None), None);
    }
}
