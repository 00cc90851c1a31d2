//! Command recording backend
//!
//! Captures generator output as a flat command list. Baked textures store
//! this list and surfaces replay it onto their native context.

use serde::{Deserialize, Serialize};

use super::{Color, DrawContext};

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate { x: f32, y: f32 },
    SetAlpha(f32),
    SetFill(Color),
    SetStroke { color: Color, width: f32 },
    BeginPath,
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadraticCurveTo { cx: f32, cy: f32, x: f32, y: f32 },
    Arc {
        x: f32,
        y: f32,
        radius: f32,
        start: f32,
        end: f32,
        counter_clockwise: bool,
    },
    Ellipse { x: f32, y: f32, rx: f32, ry: f32 },
    Rect { x: f32, y: f32, w: f32, h: f32 },
    ClosePath,
    Fill,
    Stroke,
}

/// [`DrawContext`] that records instead of drawing
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    /// Number of fill/stroke operations (what actually reaches pixels)
    pub fn paint_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill | DrawCommand::Stroke))
            .count()
    }
}

impl DrawContext for CommandRecorder {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::Translate { x, y });
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::SetAlpha(alpha));
    }

    fn set_fill(&mut self, color: Color) {
        self.commands.push(DrawCommand::SetFill(color));
    }

    fn set_stroke(&mut self, color: Color, width: f32) {
        self.commands.push(DrawCommand::SetStroke { color, width });
    }

    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(DrawCommand::LineTo { x, y });
    }

    fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.commands
            .push(DrawCommand::QuadraticCurveTo { cx, cy, x, y });
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32, counter_clockwise: bool) {
        self.commands.push(DrawCommand::Arc {
            x,
            y,
            radius,
            start,
            end,
            counter_clockwise,
        });
    }

    fn ellipse(&mut self, x: f32, y: f32, rx: f32, ry: f32) {
        self.commands.push(DrawCommand::Ellipse { x, y, rx, ry });
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.commands.push(DrawCommand::Rect { x, y, w, h });
    }

    fn close_path(&mut self) {
        self.commands.push(DrawCommand::ClosePath);
    }

    fn fill(&mut self) {
        self.commands.push(DrawCommand::Fill);
    }

    fn stroke(&mut self) {
        self.commands.push(DrawCommand::Stroke);
    }
}

/// Replay recorded commands onto another context
pub fn replay(commands: &[DrawCommand], ctx: &mut impl DrawContext) {
    for command in commands {
        match *command {
            DrawCommand::Save => ctx.save(),
            DrawCommand::Restore => ctx.restore(),
            DrawCommand::Translate { x, y } => ctx.translate(x, y),
            DrawCommand::SetAlpha(a) => ctx.set_alpha(a),
            DrawCommand::SetFill(c) => ctx.set_fill(c),
            DrawCommand::SetStroke { color, width } => ctx.set_stroke(color, width),
            DrawCommand::BeginPath => ctx.begin_path(),
            DrawCommand::MoveTo { x, y } => ctx.move_to(x, y),
            DrawCommand::LineTo { x, y } => ctx.line_to(x, y),
            DrawCommand::QuadraticCurveTo { cx, cy, x, y } => ctx.quadratic_curve_to(cx, cy, x, y),
            DrawCommand::Arc {
                x,
                y,
                radius,
                start,
                end,
                counter_clockwise,
            } => ctx.arc(x, y, radius, start, end, counter_clockwise),
            DrawCommand::Ellipse { x, y, rx, ry } => ctx.ellipse(x, y, rx, ry),
            DrawCommand::Rect { x, y, w, h } => ctx.rect(x, y, w, h),
            DrawCommand::ClosePath => ctx.close_path(),
            DrawCommand::Fill => ctx.fill(),
            DrawCommand::Stroke => ctx.stroke(),
        }
    }
}
