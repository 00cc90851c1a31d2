//! Props and stand-in textures
//!
//! Drawn into a `(0,0)..size` frame, so the results can be baked directly.

use std::f32::consts::PI;

use glam::Vec2;

use super::{Color, DrawContext};

/// Round white particle (tinted per particle at render time)
pub fn draw_particle(ctx: &mut impl DrawContext, size: f32) {
    let r = size / 2.0;
    ctx.fill_circle(r, r, r, Color::WHITE);
}

/// Soft glow: concentric circles of rising opacity
pub fn draw_particle_glow(ctx: &mut impl DrawContext, size: f32) {
    let r = size / 2.0;
    for (scale, alpha) in [(0.7, 0.3), (0.4, 0.7), (0.2, 1.0)] {
        ctx.fill_circle(r, r, r * scale, Color::WHITE.with_alpha(alpha));
    }
}

/// Five-point star
pub fn draw_particle_star(ctx: &mut impl DrawContext, size: f32) {
    let c = Vec2::splat(size / 2.0);
    let points: Vec<Vec2> = (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { size / 2.0 } else { size / 4.0 };
            let angle = i as f32 * PI / 5.0;
            c + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect();
    ctx.fill_polygon(&points, Color::WHITE);
}

/// Arrow pointing along +x, filling a `length × height` frame
pub fn draw_arrow(ctx: &mut impl DrawContext, length: f32, height: f32) {
    let mid = height / 2.0;
    let head = length * 0.2;
    ctx.stroke_polyline(
        &[Vec2::new(head * 0.5, mid), Vec2::new(length - head, mid)],
        Color::rgb(0xd3a973),
        (height * 0.3).max(1.0),
    );
    // fletching
    ctx.fill_polygon(
        &[
            Vec2::new(0.0, 0.0),
            Vec2::new(head, mid),
            Vec2::new(0.0, height),
        ],
        Color::rgb(0xeeeeee),
    );
    ctx.fill_polygon(
        &[
            Vec2::new(length - head, 0.0),
            Vec2::new(length, mid),
            Vec2::new(length - head, height),
        ],
        Color::rgb(0xa0a0a0),
    );
}

/// Stone block
pub fn draw_obstacle(ctx: &mut impl DrawContext, size: f32) {
    ctx.fill_rect(0.0, 0.0, size, size, Color::rgb(0x6d6d6d));
    ctx.set_stroke(Color::rgb(0x4a4a4a), 2.0);
    ctx.begin_path();
    ctx.rect(1.0, 1.0, size - 2.0, size - 2.0);
    ctx.move_to(0.0, size / 2.0);
    ctx.line_to(size, size / 2.0);
    ctx.move_to(size / 2.0, 0.0);
    ctx.line_to(size / 2.0, size / 2.0);
    ctx.stroke();
}

/// Glowing orb
pub fn draw_powerup(ctx: &mut impl DrawContext, size: f32) {
    let r = size / 2.0;
    ctx.fill_circle(r, r, r, Color::rgb(0xffeb3b).with_alpha(0.35));
    ctx.fill_circle(r, r, r * 0.6, Color::rgb(0xffc107));
    ctx.fill_circle(r * 0.8, r * 0.8, r * 0.15, Color::WHITE);
}

/// Arena floor: flat fill with a faint grid
pub fn draw_background(ctx: &mut impl DrawContext, width: f32, height: f32, color: Color) {
    const CELL: f32 = 50.0;

    ctx.fill_rect(0.0, 0.0, width, height, color);
    ctx.set_stroke(Color::WHITE.with_alpha(0.05), 1.0);
    ctx.begin_path();
    let mut x = CELL;
    while x < width {
        ctx.move_to(x, 0.0);
        ctx.line_to(x, height);
        x += CELL;
    }
    let mut y = CELL;
    while y < height {
        ctx.move_to(0.0, y);
        ctx.line_to(width, y);
        y += CELL;
    }
    ctx.stroke();
}
