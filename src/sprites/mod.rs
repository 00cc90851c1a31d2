//! Procedural sprite generators
//!
//! Pure drawing routines over a generic [`DrawContext`]. They hold no state:
//! the same `(kind, frame)` always produces the same geometry, so they are
//! safe to run from a texture-baking step at load time or straight onto a
//! browser canvas.

pub mod archer;
pub mod enemy;
pub mod props;
pub mod recorder;

pub use archer::{ArcherPose, draw_archer};
pub use enemy::{EnemyAnimation, EnemyKind, draw_enemy};
pub use recorder::{CommandRecorder, DrawCommand, replay};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// RGB colour with alpha
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// 0xRRGGBB
    pub rgb: u32,
    pub alpha: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xffffff);
    pub const BLACK: Color = Color::rgb(0x000000);

    pub const fn rgb(rgb: u32) -> Self {
        Self { rgb, alpha: 1.0 }
    }

    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self {
            rgb: self.rgb,
            alpha,
        }
    }

    pub fn channels(&self) -> (u8, u8, u8) {
        (
            ((self.rgb >> 16) & 0xff) as u8,
            ((self.rgb >> 8) & 0xff) as u8,
            (self.rgb & 0xff) as u8,
        )
    }

    /// CSS `rgba()` string for canvas fill/stroke styles
    pub fn to_css(&self) -> String {
        let (r, g, b) = self.channels();
        format!("rgba({r}, {g}, {b}, {})", self.alpha.clamp(0.0, 1.0))
    }
}

/// Minimal 2D path API shared by every drawing backend
pub trait DrawContext {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    /// Global alpha multiplier for subsequent fills and strokes
    fn set_alpha(&mut self, alpha: f32);
    fn set_fill(&mut self, color: Color);
    fn set_stroke(&mut self, color: Color, width: f32);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32);
    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32, counter_clockwise: bool);
    fn ellipse(&mut self, x: f32, y: f32, rx: f32, ry: f32);
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        self.set_fill(color);
        self.begin_path();
        self.arc(x, y, radius, 0.0, std::f32::consts::TAU, false);
        self.fill();
    }

    fn stroke_circle(&mut self, x: f32, y: f32, radius: f32, color: Color, width: f32) {
        self.set_stroke(color, width);
        self.begin_path();
        self.arc(x, y, radius, 0.0, std::f32::consts::TAU, false);
        self.stroke();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.set_fill(color);
        self.begin_path();
        self.rect(x, y, w, h);
        self.fill();
    }

    /// Open polyline through `points`
    fn stroke_polyline(&mut self, points: &[Vec2], color: Color, width: f32) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.set_stroke(color, width);
        self.begin_path();
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        self.stroke();
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.set_fill(color);
        self.begin_path();
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        self.close_path();
        self.fill();
    }
}
