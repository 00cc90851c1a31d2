//! Archer pose frames
//!
//! Every pose is a short loop of frames drawn around a centre point. All
//! offsets are fractions of the frame size so the same routine serves any
//! texture resolution.

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{Color, DrawContext};

/// Default archer tunic colour
pub const DEFAULT_ARCHER_COLOR: Color = Color::rgb(0x4caf50);

const SKIN: Color = Color::rgb(0xffd3b6);
const BOW: Color = Color::rgb(0x8b4513);
const STRING: Color = Color::rgb(0xe0e0e0);
const SHAFT: Color = Color::rgb(0xd3a973);
const ARROWHEAD: Color = Color::rgb(0xa0a0a0);
const HURT: Color = Color::rgb(0xff5252);

/// Archer animation poses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcherPose {
    Idle,
    Run,
    Fire,
    Hit,
    Death,
    Dash,
}

impl ArcherPose {
    pub const ALL: [ArcherPose; 6] = [
        ArcherPose::Idle,
        ArcherPose::Run,
        ArcherPose::Fire,
        ArcherPose::Hit,
        ArcherPose::Death,
        ArcherPose::Dash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArcherPose::Idle => "idle",
            ArcherPose::Run => "run",
            ArcherPose::Fire => "fire",
            ArcherPose::Hit => "hit",
            ArcherPose::Death => "death",
            ArcherPose::Dash => "dash",
        }
    }

    /// Frames in one loop of this pose
    pub fn frames(&self) -> u32 {
        match self {
            ArcherPose::Idle => 4,
            ArcherPose::Run => 8,
            ArcherPose::Fire => 5,
            ArcherPose::Hit => 3,
            ArcherPose::Death => 6,
            ArcherPose::Dash => 3,
        }
    }

    /// Playback speed in frames per 1/60 s
    pub fn speed(&self) -> f32 {
        match self {
            ArcherPose::Idle => 0.1,
            ArcherPose::Run => 0.2,
            ArcherPose::Fire => 0.3,
            ArcherPose::Hit => 0.2,
            ArcherPose::Death => 0.15,
            ArcherPose::Dash => 0.3,
        }
    }

    pub fn looping(&self) -> bool {
        matches!(self, ArcherPose::Idle | ArcherPose::Run)
    }

    /// Texture name of one baked frame, e.g. `archer_run_3`
    pub fn frame_texture(&self, frame: u32) -> String {
        format!("archer_{}_{}", self.name(), frame)
    }
}

/// Draw one archer frame centred on `center`. `frame` wraps at the pose length.
pub fn draw_archer(
    ctx: &mut impl DrawContext,
    center: Vec2,
    size: Vec2,
    pose: ArcherPose,
    frame: u32,
    color: Color,
) {
    let frame = frame % pose.frames();
    let f = Frame {
        c: center,
        w: size.x,
        h: size.y,
    };
    match pose {
        ArcherPose::Idle => idle(ctx, &f, frame, color),
        ArcherPose::Run => run(ctx, &f, frame, color),
        ArcherPose::Fire => fire(ctx, &f, frame, color),
        ArcherPose::Hit => hit(ctx, &f, frame),
        ArcherPose::Death => death(ctx, &f, frame),
        ArcherPose::Dash => dash(ctx, &f, frame, color),
    }
}

struct Frame {
    c: Vec2,
    w: f32,
    h: f32,
}

impl Frame {
    fn at(&self, fx: f32, fy: f32) -> Vec2 {
        Vec2::new(self.c.x + self.w * fx, self.c.y + self.h * fy)
    }
}

fn torso(ctx: &mut impl DrawContext, f: &Frame, dx: f32, body: Color) {
    ctx.fill_circle(f.c.x + dx, f.c.y, f.w * 0.25, body);
    ctx.fill_circle(f.c.x + dx, f.c.y - f.h * 0.2, f.w * 0.15, SKIN);
}

/// Left and right arms; `stretch` lengthens the left and shortens the right
fn arms(ctx: &mut impl DrawContext, f: &Frame, dx: f32, stretch: f32, color: Color) {
    let top = f.c.y - f.h * 0.1;
    ctx.fill_rect(f.c.x - f.w * 0.35 + dx, top, f.w * 0.1, f.h * 0.2 + stretch, color);
    ctx.fill_rect(f.c.x + f.w * 0.25 + dx, top, f.w * 0.1, f.h * 0.2 - stretch, color);
}

fn bow(ctx: &mut impl DrawContext, f: &Frame) {
    let limb = [f.at(0.3, -0.2), f.at(0.35, 0.0), f.at(0.3, 0.2)];
    ctx.stroke_polyline(&limb, BOW, 2.0);
}

fn idle(ctx: &mut impl DrawContext, f: &Frame, frame: u32, color: Color) {
    let breath = (frame as f32 * PI / 2.0).sin() * 2.0;
    torso(ctx, f, 0.0, color);
    arms(ctx, f, 0.0, breath, color);
    bow(ctx, f);
    ctx.stroke_polyline(&[f.at(0.3, -0.2), f.at(0.3, 0.2)], STRING, 1.0);
}

fn run(ctx: &mut impl DrawContext, f: &Frame, frame: u32, color: Color) {
    let swing = (frame as f32 * PI / 4.0).sin() * f.w * 0.1;

    ctx.fill_rect(f.c.x - f.w * 0.15, f.c.y, f.w * 0.1, f.h * 0.3 + swing, color);
    ctx.fill_rect(f.c.x + f.w * 0.05, f.c.y, f.w * 0.1, f.h * 0.3 - swing, color);
    torso(ctx, f, 0.0, color);
    arms(ctx, f, 0.0, swing, color);

    // slung over the back
    let limb = [f.at(-0.1, -0.2), f.at(-0.15, 0.0), f.at(-0.1, 0.2)];
    ctx.stroke_polyline(&limb, BOW, 2.0);
}

fn fire(ctx: &mut impl DrawContext, f: &Frame, frame: u32, color: Color) {
    let draw = frame as f32 / 4.0;
    let top = f.c.y - f.h * 0.1;

    torso(ctx, f, 0.0, color);
    ctx.fill_rect(f.c.x - f.w * 0.35, top, f.w * 0.1, f.h * 0.2, color);
    ctx.fill_rect(
        f.c.x + f.w * 0.25 - draw * f.w * 0.2,
        top,
        f.w * 0.1,
        f.h * 0.2,
        color,
    );
    bow(ctx, f);

    let nock = Vec2::new(f.c.x + f.w * 0.3 - draw * f.w * 0.15, f.c.y);
    ctx.stroke_polyline(&[f.at(0.3, -0.2), nock, f.at(0.3, 0.2)], STRING, 1.0);

    if draw > 0.2 {
        ctx.stroke_polyline(&[nock, f.at(0.4, 0.0)], SHAFT, 2.0);
        ctx.fill_polygon(
            &[f.at(0.4, 0.0), f.at(0.45, -0.03), f.at(0.45, 0.03)],
            ARROWHEAD,
        );
    }
}

fn hit(ctx: &mut impl DrawContext, f: &Frame, frame: u32) {
    let recoil = (frame as f32 * PI / 2.5).sin() * f.w * 0.1;
    torso(ctx, f, recoil, HURT);
    arms(ctx, f, recoil, 0.0, HURT);

    let flash = Color::WHITE.with_alpha(0.7 - frame as f32 * 0.1);
    ctx.stroke_circle(f.c.x, f.c.y, f.w * 0.3 + frame as f32 * 5.0, flash, 1.0);
}

fn death(ctx: &mut impl DrawContext, f: &Frame, frame: u32) {
    let t = frame as f32 / 5.0;
    let fall = t * PI / 2.0;
    let drop = t * f.h * 0.3;
    let shrink = 1.0 - t * 0.3;

    ctx.fill_circle(f.c.x, f.c.y + drop, f.w * 0.25 * shrink, HURT);
    ctx.fill_circle(
        f.c.x + fall.sin() * f.h * 0.2,
        f.c.y - fall.cos() * f.h * 0.2 + drop,
        f.w * 0.15 * shrink,
        SKIN,
    );

    let top = f.c.y - f.h * 0.1 + drop;
    ctx.fill_rect(f.c.x - f.w * 0.35 + t * f.w * 0.1, top, f.w * 0.1, f.h * 0.2, HURT);
    ctx.fill_rect(f.c.x + f.w * 0.25 - t * f.w * 0.1, top, f.w * 0.1, f.h * 0.2, HURT);

    if t > 0.5 {
        let fade = 1.0 - (t - 0.5) * 2.0;
        ctx.fill_circle(
            f.c.x,
            f.c.y,
            f.w * 0.4,
            Color::rgb(0xff0000).with_alpha(fade * 0.3),
        );
    }
}

fn dash(ctx: &mut impl DrawContext, f: &Frame, frame: u32, color: Color) {
    let t = frame as f32 / 2.0;
    let offset = t * f.w * 0.2;
    let alpha = 0.7 - t * 0.5;

    // afterimage
    ctx.fill_circle(f.c.x - offset * 2.0, f.c.y, f.w * 0.25, color.with_alpha(alpha * 0.5));
    ctx.fill_circle(
        f.c.x - offset * 2.0,
        f.c.y - f.h * 0.2,
        f.w * 0.15,
        SKIN.with_alpha(alpha * 0.5),
    );

    torso(ctx, f, 0.0, color);
    arms(ctx, f, 0.0, 0.0, color);

    let streak = Color::WHITE.with_alpha(alpha);
    for fy in [-0.1, 0.0, 0.1] {
        let y = f.c.y + f.h * fy;
        ctx.stroke_polyline(
            &[Vec2::new(f.c.x - offset * 3.0, y), Vec2::new(f.c.x, y)],
            streak,
            2.0,
        );
    }
}
