use contraption_core::{
    ArenaLayout, BodyCategory, Frame, FrameRenderer, Pose, RenderError, Scene, SceneBody,
    SceneSpring, Shape, Team,
};
use contraption_rendering::{
    Canvas, Color, Palette, RasterCanvas, SceneRenderer, SpriteAtlas, SpriteKey, ALL_SPRITE_KEYS,
};
use glam::Vec2;
use image::{Rgba, RgbaImage};

fn decode(frame: &Frame) -> RgbaImage {
    image::load_from_memory(frame.png_bytes())
        .expect("frame is a valid PNG")
        .to_rgba8()
}

fn rgb(color: Color) -> [u8; 4] {
    color.to_rgba().0
}

fn square_body(category: BodyCategory, team: Option<Team>, at: Vec2) -> SceneBody {
    SceneBody::new(
        category,
        team,
        Shape::Rect {
            width: 64.0,
            height: 64.0,
        },
        Pose::new(at, 0.0),
    )
}

#[test]
fn empty_scene_draws_background_and_ground() {
    let mut renderer = SceneRenderer::new(ArenaLayout::default());
    let frame = renderer.render(&Scene::default()).expect("empty scene renders");
    assert_eq!((frame.width(), frame.height()), (800, 600));

    let image = decode(&frame);
    let palette = Palette::default();
    assert_eq!(image.get_pixel(10, 10).0, rgb(palette.background));
    assert_eq!(image.get_pixel(10, 590).0, rgb(palette.ground));
    assert_eq!(image.get_pixel(799, 551).0, rgb(palette.ground));
}

#[test]
fn static_bodies_are_not_drawn_over_the_arena() {
    let mut renderer = SceneRenderer::new(ArenaLayout::default());
    let scene = Scene {
        bodies: vec![square_body(BodyCategory::Wall, None, Vec2::new(100.0, 100.0))],
        springs: Vec::new(),
    };
    let image = decode(&renderer.render(&scene).expect("scene renders"));
    assert_eq!(image.get_pixel(100, 100).0, rgb(Palette::default().background));
}

#[test]
fn placeholders_follow_body_roles() {
    let palette = Palette::default();
    let mut renderer = SceneRenderer::new(ArenaLayout::default());
    let scene = Scene {
        bodies: vec![
            square_body(BodyCategory::Debris, None, Vec2::new(100.0, 100.0)),
            square_body(BodyCategory::Box, Some(Team::Green), Vec2::new(300.0, 100.0)),
            square_body(BodyCategory::Player, Some(Team::Purple), Vec2::new(500.0, 100.0)),
        ],
        springs: Vec::new(),
    };
    let image = decode(&renderer.render(&scene).expect("scene renders"));

    assert_eq!(image.get_pixel(100, 100).0, rgb(palette.debris));
    assert_eq!(image.get_pixel(300, 100).0, rgb(palette.block));
    assert_eq!(image.get_pixel(500, 100).0, rgb(palette.purple));
}

#[test]
fn springs_are_drawn_between_endpoints_after_bodies() {
    let palette = Palette::default();
    let mut renderer = SceneRenderer::new(ArenaLayout::default());
    let scene = Scene {
        bodies: vec![square_body(BodyCategory::Box, None, Vec2::new(200.0, 300.0))],
        springs: vec![SceneSpring::new(Vec2::new(100.0, 300.0), Vec2::new(300.0, 300.0))],
    };
    let image = decode(&renderer.render(&scene).expect("scene renders"));

    assert_eq!(image.get_pixel(150, 300).0, rgb(palette.spring));
    assert_eq!(image.get_pixel(200, 300).0, rgb(palette.spring), "spring on top of box");
    assert_eq!(image.get_pixel(200, 280).0, rgb(palette.block));
}

#[test]
fn atlas_sprites_replace_placeholders() {
    let solid = |color: [u8; 4]| RgbaImage::from_pixel(4, 4, Rgba(color));
    let atlas = SpriteAtlas::from_images(ALL_SPRITE_KEYS.iter().map(|key| {
        let color = match key {
            SpriteKey::Box => [10, 20, 30, 255],
            SpriteKey::GreenPlayer => [0, 200, 0, 255],
            _ => [200, 200, 200, 255],
        };
        (*key, solid(color))
    }))
    .expect("atlas covers every key");

    let mut renderer = SceneRenderer::new(ArenaLayout::default()).with_atlas(atlas);
    let scene = Scene {
        bodies: vec![
            square_body(BodyCategory::Box, Some(Team::Purple), Vec2::new(300.0, 100.0)),
            SceneBody::new(
                BodyCategory::Player,
                Some(Team::Green),
                Shape::Rect {
                    width: 32.0,
                    height: 64.0,
                },
                Pose::new(Vec2::new(500.0, 100.0), 0.0),
            ),
        ],
        springs: Vec::new(),
    };
    let image = decode(&renderer.render(&scene).expect("scene renders"));

    assert_eq!(image.get_pixel(300, 100).0, [10, 20, 30, 255]);
    assert_eq!(image.get_pixel(520, 100).0, [0, 200, 0, 255], "player sprite is square");
}

#[test]
fn atlas_requires_every_sprite() {
    let partial = vec![(SpriteKey::Box, RgbaImage::new(1, 1))];
    assert!(SpriteAtlas::from_images(partial).is_err());
}

#[test]
fn overlay_without_font_is_an_error() {
    let mut renderer = SceneRenderer::new(ArenaLayout::default());
    let last = renderer.render(&Scene::default()).expect("scene renders");

    let error = renderer
        .victory_overlay(&last, Team::Green)
        .expect_err("a caption needs a font");
    match error {
        RenderError::Canvas(message) => assert!(message.contains("Green"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn raster_canvas_is_usable_directly() {
    let palette = Palette::default();
    let renderer = SceneRenderer::new(ArenaLayout {
        width: 40.0,
        height: 30.0,
        ground_height: 5.0,
        ..ArenaLayout::default()
    });
    let mut canvas = RasterCanvas::new(40, 30);
    renderer.paint(&mut canvas, &Scene::default());
    assert!(renderer.paint_caption(&mut canvas, Team::Purple).is_err());
    assert_eq!(canvas.size(), (40, 30));

    let image = decode(&canvas.export_png().expect("canvas exports"));
    assert_eq!(
        image.get_pixel(20, 5).0,
        rgb(palette.background),
        "a failed caption leaves the canvas untouched"
    );
}
