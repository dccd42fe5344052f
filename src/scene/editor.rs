//! Mutation surface used by the interactive editing layer.
//!
//! All editor state lives in one [`EditorState`] value. While an export job is running the
//! state is locked: every mutation is refused with [`GlideError::SceneLocked`] and leaves the
//! scene untouched, so the export is the only writer. The lock lives exactly as long as the
//! [`ExportLease`] handed to the export, so dropping a job unlocks the editor.

use std::sync::{Arc, Weak};

use crate::{
    animation::timeline::Timing,
    foundation::core::{CanvasSize, Point, Rect, Vec2},
    foundation::error::{GlideError, GlideResult},
    geometry::{arc_length::SamplerOpts, curve::Curve},
    scene::model::{ItemId, ItemView, RemovedItem, Scene, Style},
};

/// Hit radius used by point picking.
pub const DEFAULT_PICK_RADIUS: f64 = 15.0;

const NEW_ITEM_STAGGER: f64 = 40.0;
const NEW_ITEM_STAGGER_SLOTS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct EditorOpts {
    pub canvas: CanvasSize,
    pub sampler: SamplerOpts,
    /// Displacement applied to clones before on-canvas fitting.
    pub clone_offset: Vec2,
    pub default_style: Style,
    pub default_timing: Timing,
    pub default_tension: f64,
    pub pick_radius: f64,
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::default(),
            sampler: SamplerOpts::default(),
            clone_offset: Vec2::new(30.0, 30.0),
            default_style: Style::default(),
            default_timing: Timing::default(),
            default_tension: 0.0,
            pick_radius: DEFAULT_PICK_RADIUS,
        }
    }
}

/// Advisory selection: an item and optionally one of its control points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub item: ItemId,
    pub point: Option<usize>,
}

/// Proof that an export holds the editor lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct ExportLease {
    _held: (),
}

#[derive(Clone, Debug)]
pub struct EditorState {
    scene: Scene,
    canvas: CanvasSize,
    selection: Option<Selection>,
    opts: EditorOpts,
    export_lock: Weak<ExportLease>,
}

impl EditorState {
    pub fn new(opts: EditorOpts) -> Self {
        Self {
            scene: Scene::new(opts.sampler),
            canvas: opts.canvas,
            selection: None,
            opts,
            export_lock: Weak::new(),
        }
    }

    /// Wrap an existing scene (e.g. loaded from a document).
    pub fn with_scene(scene: Scene, opts: EditorOpts) -> Self {
        Self {
            canvas: opts.canvas,
            scene,
            selection: None,
            opts,
            export_lock: Weak::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn opts(&self) -> &EditorOpts {
        &self.opts
    }

    pub fn is_locked(&self) -> bool {
        self.export_lock.strong_count() > 0
    }

    /// Lock the editor until the returned lease is dropped.
    pub(crate) fn acquire_export_lock(&mut self) -> Arc<ExportLease> {
        let lease = Arc::new(ExportLease { _held: () });
        self.export_lock = Arc::downgrade(&lease);
        lease
    }

    fn ensure_unlocked(&self, op: &str) -> GlideResult<()> {
        if self.is_locked() {
            tracing::debug!(op, "ignored edit while export is running");
            return Err(GlideError::SceneLocked);
        }
        Ok(())
    }

    // -- items ---------------------------------------------------------------------------------

    /// Create a two-point moving item and select it.
    ///
    /// Style, timing and tension are inherited from the selected moving item, if any.
    pub fn add_moving_item(&mut self) -> GlideResult<ItemId> {
        self.ensure_unlocked("add_moving_item")?;

        let (style, timing, tension) = match self.selected_moving() {
            Some(m) => (m.style, m.timing, m.curve.tension()),
            None => (
                self.opts.default_style,
                self.opts.default_timing,
                self.opts.default_tension,
            ),
        };

        let slot = self.scene.moving_items().len() % NEW_ITEM_STAGGER_SLOTS;
        let y = self.canvas.height_f64() / 2.0 - 50.0 + slot as f64 * NEW_ITEM_STAGGER;
        let w = self.canvas.width_f64();
        let start = self.canvas.clamp_point(Point::new(w * 0.25, y));
        let end = self.canvas.clamp_point(Point::new(w * 0.75, y));
        let curve = Curve::new(vec![start, end], tension)?;

        let id = self.scene.push_moving(curve, style, timing);
        self.selection = Some(Selection {
            item: id,
            point: None,
        });
        tracing::debug!(id = id.0, "added moving item");
        Ok(id)
    }

    /// Create a static item (canvas centre by default) and select it.
    pub fn add_static_item(&mut self, position: Option<Point>) -> GlideResult<ItemId> {
        self.ensure_unlocked("add_static_item")?;
        let style = self
            .selection
            .and_then(|s| self.scene.item(s.item))
            .map(|v| *v.style())
            .unwrap_or(self.opts.default_style);
        let position = self.canvas.clamp_point(position.unwrap_or(Point::new(
            self.canvas.width_f64() / 2.0,
            self.canvas.height_f64() / 2.0,
        )));
        let id = self.scene.push_static(position, style);
        self.selection = Some(Selection {
            item: id,
            point: None,
        });
        Ok(id)
    }

    /// Delete an item. The newest remaining item becomes selected, or nothing.
    pub fn delete_item(&mut self, id: ItemId) -> GlideResult<RemovedItem> {
        self.ensure_unlocked("delete_item")?;
        let removed = self
            .scene
            .remove(id)
            .ok_or_else(|| GlideError::invariant(format!("no item with id {}", id.0)))?;
        self.selection = self.scene.newest_id().map(|item| Selection { item, point: None });
        Ok(removed)
    }

    pub fn delete_selected(&mut self) -> GlideResult<RemovedItem> {
        let sel = self.require_selection()?;
        self.delete_item(sel.item)
    }

    /// Remove every item and drop the selection.
    pub fn clear_all(&mut self) -> GlideResult<()> {
        self.ensure_unlocked("clear_all")?;
        self.scene.clear();
        self.selection = None;
        Ok(())
    }

    /// Duplicate an item, offset by `clone_offset` and kept on canvas. The clone is selected.
    pub fn clone_item(&mut self, id: ItemId) -> GlideResult<ItemId> {
        self.ensure_unlocked("clone_item")?;
        let offset = self.opts.clone_offset;
        let canvas = self.canvas;

        let new_id = match self.scene.item(id) {
            Some(ItemView::Moving(m)) => {
                let mut curve = m.curve.clone();
                let (style, timing) = (m.style, m.timing);
                let half = style.half_extent();
                let bounds = curve.control_bounds().inflate(half.x, half.y) + offset;
                curve.translate(offset + wrap_adjust(bounds, canvas));
                let pts: Vec<Point> = curve
                    .points()
                    .iter()
                    .map(|&p| clamp_inside(p, half, canvas))
                    .collect();
                let curve = Curve::new(pts, curve.tension())?;
                self.scene.push_moving(curve, style, timing)
            }
            Some(ItemView::Static(s)) => {
                let style = s.style;
                let half = style.half_extent();
                let moved = s.position + offset;
                let bounds = Rect::from_center_size(moved, (style.width, style.height));
                let position = clamp_inside(moved + wrap_adjust(bounds, canvas), half, canvas);
                self.scene.push_static(position, style)
            }
            None => return Err(GlideError::invariant(format!("no item with id {}", id.0))),
        };

        self.selection = Some(Selection {
            item: new_id,
            point: None,
        });
        Ok(new_id)
    }

    // -- control points ------------------------------------------------------------------------

    /// Bisect the longest segment of a moving item's curve. Returns the new point index.
    pub fn add_point(&mut self, id: ItemId) -> GlideResult<usize> {
        self.ensure_unlocked("add_point")?;
        let sampler = self.scene.sampler_opts();
        let item = self.moving_mut(id)?;
        Ok(item.curve.bisect_longest_segment(sampler))
    }

    pub fn add_point_to_selected(&mut self) -> GlideResult<usize> {
        let sel = self.require_selection()?;
        self.add_point(sel.item)
    }

    /// Remove a control point; refused when the curve has only two points.
    pub fn remove_point(&mut self, id: ItemId, index: usize) -> GlideResult<Point> {
        self.ensure_unlocked("remove_point")?;
        let removed = self.moving_mut(id)?.curve.remove_point(index)?;
        if let Some(sel) = self.selection.as_mut()
            && sel.item == id
        {
            sel.point = None;
        }
        Ok(removed)
    }

    pub fn remove_selected_point(&mut self) -> GlideResult<Point> {
        let sel = self.require_selection()?;
        let index = sel
            .point
            .ok_or_else(|| GlideError::invariant("no control point selected"))?;
        self.remove_point(sel.item, index)
    }

    /// Drag a control point; the position is clamped to the canvas.
    pub fn move_point(&mut self, id: ItemId, index: usize, to: Point) -> GlideResult<()> {
        self.ensure_unlocked("move_point")?;
        let to = self.canvas.clamp_point(to);
        self.moving_mut(id)?.curve.set_point(index, to)
    }

    /// Move a static item; the position is clamped to the canvas.
    pub fn move_static(&mut self, id: ItemId, to: Point) -> GlideResult<()> {
        self.ensure_unlocked("move_static")?;
        let to = self.canvas.clamp_point(to);
        let item = self
            .scene
            .static_mut(id)
            .ok_or_else(|| GlideError::invariant(format!("no static item with id {}", id.0)))?;
        item.position = to;
        Ok(())
    }

    // -- per-item parameters -------------------------------------------------------------------

    pub fn set_style(&mut self, id: ItemId, style: Style) -> GlideResult<()> {
        self.ensure_unlocked("set_style")?;
        style.validate()?;
        if let Some(m) = self.scene.moving_mut(id) {
            m.style = style;
            return Ok(());
        }
        let s = self
            .scene
            .static_mut(id)
            .ok_or_else(|| GlideError::invariant(format!("no item with id {}", id.0)))?;
        s.style = style;
        Ok(())
    }

    pub fn set_timing(&mut self, id: ItemId, timing: Timing) -> GlideResult<()> {
        self.ensure_unlocked("set_timing")?;
        timing.validate()?;
        self.moving_mut(id)?.timing = timing;
        Ok(())
    }

    pub fn set_tension(&mut self, id: ItemId, tension: f64) -> GlideResult<()> {
        self.ensure_unlocked("set_tension")?;
        self.moving_mut(id)?.curve.set_tension(tension)
    }

    // -- canvas --------------------------------------------------------------------------------

    /// Resize the canvas, rescaling every coordinate proportionally.
    pub fn resize_canvas(&mut self, size: CanvasSize) -> GlideResult<()> {
        self.ensure_unlocked("resize_canvas")?;
        let size = CanvasSize::new(size.width, size.height)?;
        if size == self.canvas {
            return Ok(());
        }
        let scale = self.canvas.scale_to(size);
        self.scene.scale_points(scale.x, scale.y);
        self.canvas = size;
        tracing::debug!(width = size.width, height = size.height, "canvas resized");
        Ok(())
    }

    // -- selection -----------------------------------------------------------------------------

    pub fn select(&mut self, id: ItemId) -> GlideResult<()> {
        self.ensure_unlocked("select")?;
        if !self.scene.contains(id) {
            return Err(GlideError::invariant(format!("no item with id {}", id.0)));
        }
        self.selection = Some(Selection {
            item: id,
            point: None,
        });
        Ok(())
    }

    pub fn clear_selection(&mut self) -> GlideResult<()> {
        self.ensure_unlocked("clear_selection")?;
        self.selection = None;
        Ok(())
    }

    /// First control point within the pick radius of `pos`, scanning items in stored order.
    pub fn pick_point(&self, pos: Point) -> Option<(ItemId, usize)> {
        self.scene.moving_items().iter().find_map(|m| {
            m.curve
                .points()
                .iter()
                .position(|p| p.distance(pos) < self.opts.pick_radius)
                .map(|i| (m.id, i))
        })
    }

    /// Select the control point under `pos`, if any.
    pub fn select_at(&mut self, pos: Point) -> GlideResult<Option<Selection>> {
        self.ensure_unlocked("select_at")?;
        let hit = self.pick_point(pos).map(|(item, point)| Selection {
            item,
            point: Some(point),
        });
        if hit.is_some() {
            self.selection = hit;
        }
        Ok(hit)
    }

    fn require_selection(&self) -> GlideResult<Selection> {
        self.selection
            .ok_or_else(|| GlideError::invariant("no item selected"))
    }

    fn selected_moving(&self) -> Option<&crate::scene::model::MovingItem> {
        self.scene.moving(self.selection?.item)
    }

    fn moving_mut(&mut self, id: ItemId) -> GlideResult<&mut crate::scene::model::MovingItem> {
        self.scene
            .moving_mut(id)
            .ok_or_else(|| GlideError::invariant(format!("no moving item with id {}", id.0)))
    }
}

/// Shift back by a quarter canvas on each axis where `bounds` spills past the far edge.
fn wrap_adjust(bounds: Rect, canvas: CanvasSize) -> Vec2 {
    let (w, h) = (canvas.width_f64(), canvas.height_f64());
    Vec2::new(
        if bounds.x1 > w { -w / 4.0 } else { 0.0 },
        if bounds.y1 > h { -h / 4.0 } else { 0.0 },
    )
}

/// Clamp a shape centre so the shape stays on canvas; oversized shapes are centred.
fn clamp_inside(p: Point, half: Vec2, canvas: CanvasSize) -> Point {
    fn axis(v: f64, half: f64, dim: f64) -> f64 {
        if 2.0 * half >= dim {
            dim / 2.0
        } else {
            v.clamp(half, dim - half)
        }
    }
    Point::new(
        axis(p.x, half.x, canvas.width_f64()),
        axis(p.y, half.y, canvas.height_f64()),
    )
}
