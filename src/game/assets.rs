//! Asset manifest, procedural frames and stand-ins

use glam::Vec2;

use crate::renderer::{SpriteRenderer, StaticTextureLoader, TextureLoader};
use crate::sprites::archer::DEFAULT_ARCHER_COLOR;
use crate::sprites::{ArcherPose, Color, draw_archer, props};

/// One required image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetEntry {
    pub name: &'static str,
    pub url: &'static str,
    /// Size of the shipped image, used for stand-ins
    pub width: u32,
    pub height: u32,
}

const fn entry(name: &'static str, url: &'static str, width: u32, height: u32) -> AssetEntry {
    AssetEntry {
        name,
        url,
        width,
        height,
    }
}

pub const BACKGROUND: &str = "background";
pub const PLAYER_IDLE: &str = "player-idle";
pub const PLAYER_RUN: &str = "player-run";
pub const PLAYER_SHOOT: &str = "player-shoot";
pub const ARROW: &str = "arrow";
pub const OBSTACLE: &str = "obstacle";
pub const POWERUP: &str = "powerup";

pub const MANIFEST: [AssetEntry; 7] = [
    entry(BACKGROUND, "/images/archer-game-background.png", 800, 600),
    entry(PLAYER_IDLE, "/images/archer-idle.png", 64, 64),
    entry(PLAYER_RUN, "/images/archer-run.png", 64, 64),
    entry(PLAYER_SHOOT, "/images/archer-shoot.png", 64, 64),
    entry(ARROW, "/images/arrow.png", 32, 8),
    entry(OBSTACLE, "/images/obstacle.png", 64, 64),
    entry(POWERUP, "/images/powerup.png", 32, 32),
];

/// Edge length of baked archer frames
pub const ARCHER_FRAME_SIZE: u32 = 64;

/// What `load_assets` ended up with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub loaded: usize,
    /// Names that failed to load and were replaced by a procedural stand-in
    pub substituted: Vec<String>,
}

/// Loader that knows every manifest url, for headless runs
pub fn static_loader() -> StaticTextureLoader {
    MANIFEST
        .iter()
        .fold(StaticTextureLoader::new(), |loader, e| {
            loader.with(e.url, e.width, e.height)
        })
}

/// Load the manifest, bake stand-ins for anything that failed, then bake
/// the procedural textures every game needs
pub async fn load_assets(renderer: &mut SpriteRenderer, loader: &impl TextureLoader) -> AssetReport {
    let entries: Vec<(&str, &str)> = MANIFEST.iter().map(|e| (e.name, e.url)).collect();
    let mut report = AssetReport::default();

    if let Err(e) = renderer.load_textures(loader, &entries).await {
        log::warn!("Using procedural stand-ins: {e}");
    }
    for asset in &MANIFEST {
        if renderer.has_texture(asset.name) {
            report.loaded += 1;
        } else {
            bake_stand_in(renderer, asset);
            report.substituted.push(asset.name.to_owned());
        }
    }

    bake_particles(renderer);
    bake_archer_frames(renderer, DEFAULT_ARCHER_COLOR);
    log::info!(
        "Game assets ready ({} loaded, {} substituted)",
        report.loaded,
        report.substituted.len()
    );
    report
}

/// Procedural replacement for one manifest image, same name and size
pub fn bake_stand_in(renderer: &mut SpriteRenderer, asset: &AssetEntry) {
    let (w, h) = (asset.width as f32, asset.height as f32);
    let pose = match asset.name {
        PLAYER_IDLE => Some(ArcherPose::Idle),
        PLAYER_RUN => Some(ArcherPose::Run),
        PLAYER_SHOOT => Some(ArcherPose::Fire),
        _ => None,
    };
    renderer.bake_texture(asset.name, asset.width, asset.height, |ctx| {
        if let Some(pose) = pose {
            draw_archer(ctx, Vec2::new(w, h) / 2.0, Vec2::new(w, h), pose, 0, DEFAULT_ARCHER_COLOR);
            return;
        }
        match asset.name {
            BACKGROUND => props::draw_background(ctx, w, h, Color::rgb(0x1a1a1a)),
            ARROW => props::draw_arrow(ctx, w, h),
            OBSTACLE => props::draw_obstacle(ctx, w.min(h)),
            POWERUP => props::draw_powerup(ctx, w.min(h)),
            _ => props::draw_particle(ctx, w.min(h)),
        }
    });
}

/// Particle sprites (tinted per particle)
pub fn bake_particles(renderer: &mut SpriteRenderer) {
    renderer.bake_texture(crate::particles::PARTICLE_TEXTURE, 16, 16, |ctx| {
        props::draw_particle(ctx, 16.0)
    });
    renderer.bake_texture("particle-star", 16, 16, |ctx| props::draw_particle_star(ctx, 16.0));
    renderer.bake_texture("particle-glow", 32, 32, |ctx| props::draw_particle_glow(ctx, 32.0));
}

/// Every archer pose as a frame sequence named by [`ArcherPose::frame_texture`]
pub fn bake_archer_frames(renderer: &mut SpriteRenderer, color: Color) {
    let size = ARCHER_FRAME_SIZE as f32;
    for pose in ArcherPose::ALL {
        for frame in 0..pose.frames() {
            renderer.bake_texture(
                &pose.frame_texture(frame),
                ARCHER_FRAME_SIZE,
                ARCHER_FRAME_SIZE,
                |ctx| draw_archer(ctx, Vec2::splat(size / 2.0), Vec2::splat(size), pose, frame, color),
            );
        }
    }
}

/// Frame texture names for one pose
pub fn archer_frames(pose: ArcherPose) -> Vec<String> {
    (0..pose.frames()).map(|f| pose.frame_texture(f)).collect()
}
