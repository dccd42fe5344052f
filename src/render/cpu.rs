//! Software rasterizer backed by `vello_cpu`.

use crate::{
    foundation::core::{Affine, BezPath, CanvasSize, Point, Rgba8},
    foundation::error::{GlideError, GlideResult},
    render::canvas::Canvas2D,
    render::frame::FrameRGBA,
};

pub struct CpuCanvas {
    size: CanvasSize,
    width: u16,
    height: u16,
    transform: Affine,
    ctx: vello_cpu::RenderContext,
}

impl CpuCanvas {
    pub fn new(size: CanvasSize) -> GlideResult<Self> {
        let size = CanvasSize::new(size.width, size.height)?;
        let width: u16 = size
            .width
            .try_into()
            .map_err(|_| GlideError::validation("canvas width exceeds u16"))?;
        let height: u16 = size
            .height
            .try_into()
            .map_err(|_| GlideError::validation("canvas height exceeds u16"))?;
        Ok(Self {
            size,
            width,
            height,
            transform: Affine::IDENTITY,
            ctx: vello_cpu::RenderContext::new(width, height),
        })
    }

    /// Rasterize everything drawn since the last [`Canvas2D::clear`].
    #[tracing::instrument(level = "trace", skip(self), fields(width = self.width, height = self.height))]
    pub fn snapshot(&mut self) -> GlideResult<FrameRGBA> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        let data = pixmap.data_as_u8_slice().to_vec();
        if data.len() != FrameRGBA::byte_len(self.size.width, self.size.height) {
            return Err(GlideError::invariant("pixmap size does not match canvas"));
        }
        Ok(FrameRGBA {
            width: self.size.width,
            height: self.size.height,
            data,
            premultiplied: true,
        })
    }

    fn set_color(&mut self, color: Rgba8) {
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
    }
}

impl Canvas2D for CpuCanvas {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self, color: Rgba8) {
        self.ctx = vello_cpu::RenderContext::new(self.width, self.height);
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.set_color(color);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn fill_path(&mut self, path: &BezPath, color: Rgba8) {
        self.ctx.set_transform(affine_to_cpu(self.transform));
        self.set_color(color);
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    fn stroke_path(&mut self, path: &BezPath, color: Rgba8, width: f64) {
        self.ctx.set_transform(affine_to_cpu(self.transform));
        self.set_color(color);
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
        self.ctx.stroke_path(&bezpath_to_cpu(path));
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
