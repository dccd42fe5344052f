//! Live preview: the same timeline evaluation as export, driven by a wall clock.

use crate::{
    foundation::clock::Clock,
    foundation::core::{Point, Rgba8},
    render::canvas::{Canvas2D, OutputScale, draw_commands, draw_overlay},
    scene::editor::EditorState,
    scene::model::{ItemId, Scene},
    scene::query::{DrawCommand, LoopPolicy},
};

pub const PREVIEW_BACKGROUND: Rgba8 = Rgba8::opaque(240, 240, 240);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewOpts {
    pub loop_policy: LoopPolicy,
    pub background: Rgba8,
    /// Draw curve outlines and direction arrows under the moving shapes.
    pub overlay: bool,
}

impl Default for PreviewOpts {
    fn default() -> Self {
        Self {
            loop_policy: LoopPolicy::PerItem,
            background: PREVIEW_BACKGROUND,
            overlay: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Preview {
    origin_ms: f64,
    opts: PreviewOpts,
}

impl Preview {
    /// Start a preview whose time origin is the clock's current reading.
    pub fn new(opts: PreviewOpts, clock: &dyn Clock) -> Self {
        Self {
            origin_ms: clock.now_ms(),
            opts,
        }
    }

    pub fn origin_ms(&self) -> f64 {
        self.origin_ms
    }

    pub fn opts(&self) -> &PreviewOpts {
        &self.opts
    }

    /// Replay every item from its start.
    pub fn restart(&mut self, now_ms: f64) {
        self.origin_ms = now_ms;
    }

    pub fn commands_at(&self, scene: &Scene, now_ms: f64) -> Vec<DrawCommand> {
        scene.draw_commands(now_ms, self.origin_ms, self.opts.loop_policy)
    }

    pub fn position_of(&self, scene: &Scene, id: ItemId, now_ms: f64) -> Option<Point> {
        let looping = match scene.moving(id) {
            Some(m) => self.opts.loop_policy.resolve(&m.timing),
            None => false,
        };
        scene.position_of_id(id, now_ms, self.origin_ms, looping)
    }

    /// Paint one preview frame. While an export holds the editor only the background is drawn.
    pub fn render(&self, canvas: &mut dyn Canvas2D, editor: &EditorState, now_ms: f64) {
        canvas.clear(self.opts.background);
        if editor.is_locked() {
            return;
        }
        if self.opts.overlay {
            draw_overlay(canvas, editor);
        }
        let commands = self.commands_at(editor.scene(), now_ms);
        draw_commands(canvas, &commands, OutputScale::IDENTITY);
    }

    pub fn tick(&self, canvas: &mut dyn Canvas2D, editor: &EditorState, clock: &dyn Clock) {
        self.render(canvas, editor, clock.now_ms());
    }
}
