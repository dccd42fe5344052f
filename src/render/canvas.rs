//! Drawing surface abstraction plus the scene and editor-overlay painters built on it.

use kurbo::Shape as _;

use crate::{
    foundation::core::{Affine, BezPath, CanvasSize, Point, Rect, Rgba8, Vec2},
    scene::editor::EditorState,
    scene::model::ShapeKind,
    scene::query::DrawCommand,
};

const CURVE_COLOR: Rgba8 = Rgba8::BLACK;
const CURVE_WIDTH: f64 = 2.0;
const SELECTED_CURVE_COLOR: Rgba8 = Rgba8::opaque(255, 0, 0);
const SELECTED_CURVE_WIDTH: f64 = 3.0;

const ARROW_SIZE: f64 = 20.0;
const ARROW_STROKE_WIDTH: f64 = 1.5;
const ARROW_FILL: Rgba8 = Rgba8::new(0, 150, 255, 153);
const ARROW_STROKE: Rgba8 = Rgba8::opaque(0, 100, 255);
const SELECTED_ARROW_FILL: Rgba8 = Rgba8::new(255, 0, 0, 153);
const SELECTED_ARROW_STROKE: Rgba8 = Rgba8::opaque(200, 0, 0);

/// Fill and outline colours for one shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub fill: Rgba8,
    pub stroke: Rgba8,
    pub stroke_width: f64,
}

/// A raster target. Shapes are drawn centred on the origin of the current transform.
pub trait Canvas2D {
    fn size(&self) -> CanvasSize;

    fn clear(&mut self, color: Rgba8);

    fn set_transform(&mut self, transform: Affine);

    fn fill_path(&mut self, path: &BezPath, color: Rgba8);

    fn stroke_path(&mut self, path: &BezPath, color: Rgba8, width: f64);

    fn draw_shape(&mut self, kind: ShapeKind, width: f64, height: f64, paint: &Paint) {
        let path = shape_path(kind, width, height);
        self.fill_path(&path, paint.fill);
        if paint.stroke_width > 0.0 {
            self.stroke_path(&path, paint.stroke, paint.stroke_width);
        }
    }
}

/// Outline of `kind` with the given extent, centred on the origin.
pub fn shape_path(kind: ShapeKind, width: f64, height: f64) -> BezPath {
    match kind {
        ShapeKind::Circle => {
            kurbo::Ellipse::new(Point::ORIGIN, Vec2::new(width / 2.0, height / 2.0), 0.0)
                .to_path(0.1)
        }
        ShapeKind::Square => Rect::from_center_size(Point::ORIGIN, (width, height)).to_path(0.1),
        ShapeKind::Triangle => {
            let mut p = BezPath::new();
            p.move_to((-width / 2.0, height / 2.0));
            p.line_to((width / 2.0, height / 2.0));
            p.line_to((0.0, -height / 2.0));
            p.close_path();
            p
        }
    }
}

/// Mapping from scene coordinates to an output raster of a different size.
///
/// Positions scale per axis. Shape extents scale by the larger factor so shapes keep their
/// aspect ratio, and stroke widths by the mean factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputScale {
    pub sx: f64,
    pub sy: f64,
}

impl OutputScale {
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0 };

    pub fn between(scene: CanvasSize, output: CanvasSize) -> Self {
        let v = scene.scale_to(output);
        Self { sx: v.x, sy: v.y }
    }

    pub fn position(self, p: Point) -> Point {
        Point::new(p.x * self.sx, p.y * self.sy)
    }

    pub fn size_factor(self) -> f64 {
        self.sx.max(self.sy)
    }

    pub fn stroke_factor(self) -> f64 {
        (self.sx + self.sy) / 2.0
    }
}

impl Default for OutputScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Paint `commands` in order.
pub fn draw_commands(canvas: &mut dyn Canvas2D, commands: &[DrawCommand], scale: OutputScale) {
    let k = scale.size_factor();
    for cmd in commands {
        let paint = Paint {
            fill: cmd.style.fill,
            stroke: cmd.style.stroke,
            stroke_width: cmd.style.stroke_weight * scale.stroke_factor(),
        };
        canvas.set_transform(Affine::translate(scale.position(cmd.position).to_vec2()));
        canvas.draw_shape(cmd.shape, cmd.style.width * k, cmd.style.height * k, &paint);
    }
    canvas.set_transform(Affine::IDENTITY);
}

/// Curve outlines and per-point direction arrows for the editor view.
pub fn draw_overlay(canvas: &mut dyn Canvas2D, editor: &EditorState) {
    let selection = editor.selection();
    for item in editor.scene().moving_items() {
        let selected_item = selection.is_some_and(|s| s.item == item.id);
        let (color, width) = if selected_item {
            (SELECTED_CURVE_COLOR, SELECTED_CURVE_WIDTH)
        } else {
            (CURVE_COLOR, CURVE_WIDTH)
        };
        canvas.set_transform(Affine::IDENTITY);
        canvas.stroke_path(&item.curve.to_bezpath(), color, width);

        let points = item.curve.points();
        for (i, p) in points.iter().enumerate() {
            let selected_point = selected_item && selection.and_then(|s| s.point) == Some(i);
            let paint = if selected_point {
                Paint {
                    fill: SELECTED_ARROW_FILL,
                    stroke: SELECTED_ARROW_STROKE,
                    stroke_width: ARROW_STROKE_WIDTH,
                }
            } else {
                Paint {
                    fill: ARROW_FILL,
                    stroke: ARROW_STROKE,
                    stroke_width: ARROW_STROKE_WIDTH,
                }
            };
            let dir = arrow_direction(points, i);
            canvas.set_transform(Affine::translate(p.to_vec2()) * Affine::rotate(dir.atan2()));
            let arrow = arrow_path(ARROW_SIZE);
            canvas.fill_path(&arrow, paint.fill);
            canvas.stroke_path(&arrow, paint.stroke, paint.stroke_width);
        }
    }
    canvas.set_transform(Affine::IDENTITY);
}

/// Travel direction at control point `i`: towards the next point at the start, away from the
/// previous one at the end, and along the neighbour chord in between.
fn arrow_direction(points: &[Point], i: usize) -> Vec2 {
    let last = points.len() - 1;
    if i == 0 {
        points[1] - points[0]
    } else if i == last {
        points[last] - points[last - 1]
    } else {
        (points[i + 1] - points[i - 1]) * 0.5
    }
}

fn arrow_path(s: f64) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((s, 0.0));
    p.line_to((-s * 0.6, s * 0.5));
    p.line_to((-s * 0.3, 0.0));
    p.line_to((-s * 0.6, -s * 0.5));
    p.close_path();
    p
}

/// Recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    Clear(Rgba8),
    Fill {
        transform: Affine,
        path: BezPath,
        color: Rgba8,
    },
    Stroke {
        transform: Affine,
        path: BezPath,
        color: Rgba8,
        width: f64,
    },
}

/// Canvas that records calls instead of rasterizing them.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    size: CanvasSize,
    transform: Affine,
    pub ops: Vec<CanvasOp>,
}

impl RecordingCanvas {
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            transform: Affine::IDENTITY,
            ops: Vec::new(),
        }
    }

    /// Translation of every fill, in call order.
    pub fn fill_origins(&self) -> Vec<Point> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Fill { transform, .. } => Some(*transform * Point::ORIGIN),
                _ => None,
            })
            .collect()
    }
}

impl Canvas2D for RecordingCanvas {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self, color: Rgba8) {
        self.ops.clear();
        self.ops.push(CanvasOp::Clear(color));
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_path(&mut self, path: &BezPath, color: Rgba8) {
        self.ops.push(CanvasOp::Fill {
            transform: self.transform,
            path: path.clone(),
            color,
        });
    }

    fn stroke_path(&mut self, path: &BezPath, color: Rgba8, width: f64) {
        self.ops.push(CanvasOp::Stroke {
            transform: self.transform,
            path: path.clone(),
            color,
            width,
        });
    }
}
