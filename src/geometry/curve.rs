//! Tension-controlled cubic curve through an ordered list of control points.
//!
//! Each segment `P(i) -> P(i+1)` is a cubic Bézier whose inner control points are derived
//! Catmull-Rom style from the neighbouring points:
//!
//! ```text
//! cp1 = P(i)   + (P(i+1) - P(i-1)) * k
//! cp2 = P(i+1) - (P(i+2) - P(i))   * k      k = tension / 6
//! ```
//!
//! Missing neighbours at either end are replaced by the endpoint itself, so the curve leaves its
//! first point and enters its last point without bending. A two-point curve is a straight line
//! regardless of tension.

use kurbo::{CubicBez, Line, ParamCurve, PathSeg};

use crate::{
    foundation::core::{BezPath, Point, Vec2},
    foundation::error::{GlideError, GlideResult},
    geometry::arc_length::{ArcLengthSampler, SamplerOpts},
};

/// Fewest control points a curve may hold.
pub const MIN_POINTS: usize = 2;

const TENSION_DIVISOR: f64 = 6.0;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "CurveDef")]
pub struct Curve {
    points: Vec<Point>,
    tension: f64,
}

#[derive(serde::Deserialize)]
struct CurveDef {
    points: Vec<Point>,
    #[serde(default)]
    tension: f64,
}

impl TryFrom<CurveDef> for Curve {
    type Error = GlideError;

    fn try_from(def: CurveDef) -> Result<Self, Self::Error> {
        Self::new(def.points, def.tension)
    }
}

impl Curve {
    pub fn new(points: Vec<Point>, tension: f64) -> GlideResult<Self> {
        if points.len() < MIN_POINTS {
            return Err(GlideError::geometry(format!(
                "curve needs at least {MIN_POINTS} points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(GlideError::geometry("curve points must be finite"));
        }
        if !tension.is_finite() {
            return Err(GlideError::validation("curve tension must be finite"));
        }
        Ok(Self { points, tension })
    }

    /// Straight two-point curve.
    pub fn line(start: Point, end: Point) -> GlideResult<Self> {
        Self::new(vec![start, end], 0.0)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn first_point(&self) -> Point {
        self.points[0]
    }

    pub fn last_point(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn tension(&self) -> f64 {
        self.tension
    }

    pub fn set_tension(&mut self, tension: f64) -> GlideResult<()> {
        if !tension.is_finite() {
            return Err(GlideError::validation("curve tension must be finite"));
        }
        self.tension = tension;
        Ok(())
    }

    /// Geometry of segment `index`, or `None` when the index is out of range.
    pub fn segment(&self, index: usize) -> Option<PathSeg> {
        if index >= self.segment_count() {
            return None;
        }
        let p1 = self.points[index];
        let p2 = self.points[index + 1];
        if self.points.len() == MIN_POINTS {
            return Some(PathSeg::Line(Line::new(p1, p2)));
        }

        let p0 = if index > 0 { self.points[index - 1] } else { p1 };
        let p3 = self.points.get(index + 2).copied().unwrap_or(p2);

        let k = self.tension / TENSION_DIVISOR;
        let cp1 = p1 + (p2 - p0) * k;
        let cp2 = p2 - (p3 - p1) * k;
        Some(PathSeg::Cubic(CubicBez::new(p1, cp1, cp2, p2)))
    }

    /// Evaluate segment `index` at parameter `t` (clamped to `[0, 1]`).
    ///
    /// Returns `None` for an out-of-range segment index.
    pub fn point_on_segment(&self, index: usize, t: f64) -> Option<Point> {
        self.segment(index).map(|seg| seg.eval(t.clamp(0.0, 1.0)))
    }

    /// Like [`Curve::point_on_segment`], reporting a bad index as [`GlideError::InvalidGeometry`].
    pub fn try_point_on_segment(&self, index: usize, t: f64) -> GlideResult<Point> {
        self.point_on_segment(index, t).ok_or_else(|| {
            GlideError::geometry(format!(
                "segment index {index} out of range [0, {}]",
                self.segment_count() - 1
            ))
        })
    }

    /// Outline of the whole curve, for stroking.
    pub fn to_bezpath(&self) -> BezPath {
        BezPath::from_path_segments((0..self.segment_count()).filter_map(|i| self.segment(i)))
    }

    pub fn set_point(&mut self, index: usize, p: Point) -> GlideResult<()> {
        if !p.is_finite() {
            return Err(GlideError::geometry("curve points must be finite"));
        }
        let count = self.points.len();
        let slot = self.points.get_mut(index).ok_or_else(|| {
            GlideError::geometry(format!("point index {index} out of range (len {count})"))
        })?;
        *slot = p;
        Ok(())
    }

    /// Remove point `index`. The curve never drops below [`MIN_POINTS`].
    pub fn remove_point(&mut self, index: usize) -> GlideResult<Point> {
        if self.points.len() <= MIN_POINTS {
            return Err(GlideError::invariant(format!(
                "a curve must keep at least {MIN_POINTS} points"
            )));
        }
        if index >= self.points.len() {
            return Err(GlideError::geometry(format!(
                "point index {index} out of range (len {})",
                self.points.len()
            )));
        }
        Ok(self.points.remove(index))
    }

    /// Insert a point halfway (by sampled arc length) along the currently longest segment.
    ///
    /// Returns the index of the new point.
    pub fn bisect_longest_segment(&mut self, opts: SamplerOpts) -> usize {
        let sampler = ArcLengthSampler::new(self, opts);
        let (segment, _) = sampler.longest_segment();
        let mid = sampler.segment_midpoint(segment);
        self.points.insert(segment + 1, mid);
        segment + 1
    }

    pub fn translate(&mut self, by: Vec2) {
        for p in &mut self.points {
            *p += by;
        }
    }

    /// Scale every coordinate per axis (canvas resize).
    pub fn scale_non_uniform(&mut self, sx: f64, sy: f64) {
        for p in &mut self.points {
            *p = Point::new(p.x * sx, p.y * sy);
        }
    }

    /// Same path traversed in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            tension: self.tension,
        }
    }

    /// Axis-aligned bounds of the control points.
    pub fn control_bounds(&self) -> kurbo::Rect {
        let first = self.points[0];
        self.points
            .iter()
            .skip(1)
            .fold(kurbo::Rect::from_points(first, first), |r, p| {
                r.union_pt(*p)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag(tension: f64) -> Curve {
        Curve::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 50.0),
                Point::new(200.0, 0.0),
                Point::new(300.0, 50.0),
            ],
            tension,
        )
        .unwrap()
    }

    #[test]
    fn rejects_fewer_than_two_points() {
        assert!(Curve::new(vec![Point::ORIGIN], 0.0).is_err());
        assert!(Curve::new(vec![], 0.0).is_err());
        assert!(Curve::new(vec![Point::ORIGIN, Point::new(f64::NAN, 0.0)], 0.0).is_err());
    }

    #[test]
    fn two_points_are_linear_for_any_tension() {
        for tension in [-3.0, 0.0, 1.0, 12.0] {
            let c = Curve::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 20.0)], tension).unwrap();
            let mid = c.point_on_segment(0, 0.5).unwrap();
            assert_eq!(mid, Point::new(5.0, 10.0));
        }
    }

    #[test]
    fn segments_hit_their_anchors() {
        let c = zigzag(1.0);
        for i in 0..c.segment_count() {
            let a = c.point_on_segment(i, 0.0).unwrap();
            let b = c.point_on_segment(i, 1.0).unwrap();
            assert!((a - c.points()[i]).hypot() < 1e-9);
            assert!((b - c.points()[i + 1]).hypot() < 1e-9);
        }
    }

    #[test]
    fn endpoints_use_phantom_neighbours() {
        let c = zigzag(3.0);
        let PathSeg::Cubic(first) = c.segment(0).unwrap() else {
            panic!("expected cubic segment");
        };
        // p0 == p1 at the start, so cp1 = p1 + (p2 - p1) * k.
        let k = 3.0 / 6.0;
        let expected = Point::new(0.0, 0.0) + (Point::new(100.0, 50.0) - Point::new(0.0, 0.0)) * k;
        assert!((first.p1 - expected).hypot() < 1e-12);

        let PathSeg::Cubic(last) = c.segment(2).unwrap() else {
            panic!("expected cubic segment");
        };
        let expected =
            Point::new(300.0, 50.0) - (Point::new(300.0, 50.0) - Point::new(200.0, 0.0)) * k;
        assert!((last.p2 - expected).hypot() < 1e-12);
    }

    #[test]
    fn out_of_range_segment_is_no_result() {
        let c = zigzag(0.0);
        assert!(c.point_on_segment(3, 0.5).is_none());
        assert!(matches!(
            c.try_point_on_segment(7, 0.0),
            Err(GlideError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn removal_respects_floor() {
        let mut c = Curve::line(Point::ORIGIN, Point::new(1.0, 1.0)).unwrap();
        assert!(matches!(
            c.remove_point(0),
            Err(GlideError::InvariantViolation(_))
        ));
        assert_eq!(c.point_count(), 2);

        let mut z = zigzag(0.0);
        assert_eq!(z.remove_point(1).unwrap(), Point::new(100.0, 50.0));
        assert_eq!(z.point_count(), 3);
        assert!(z.remove_point(9).is_err());
    }

    #[test]
    fn bisect_splits_the_longest_segment() {
        let mut c = Curve::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(110.0, 0.0),
            ],
            0.0,
        )
        .unwrap();
        let idx = c.bisect_longest_segment(SamplerOpts::default());
        assert_eq!(idx, 2);
        assert_eq!(c.point_count(), 4);
        let p = c.points()[2];
        assert!((p.x - 60.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn bezpath_has_one_element_per_segment_plus_move() {
        let c = zigzag(1.0);
        assert_eq!(c.to_bezpath().elements().len(), 1 + c.segment_count());
    }

    #[test]
    fn scale_and_translate_move_every_point() {
        let mut c = zigzag(0.0);
        c.scale_non_uniform(2.0, 0.5);
        assert_eq!(c.last_point(), Point::new(600.0, 25.0));
        c.translate(Vec2::new(-600.0, 0.0));
        assert_eq!(c.last_point(), Point::new(0.0, 25.0));
        let b = c.control_bounds();
        assert_eq!(b.x0, -600.0);
        assert_eq!(b.y1, 25.0);
    }

    #[test]
    fn deserialize_validates_point_count() {
        let ok: Curve =
            serde_json::from_str(r#"{"points":[{"x":0,"y":0},{"x":1,"y":0}]}"#).unwrap();
        assert_eq!(ok.tension(), 0.0);
        assert!(serde_json::from_str::<Curve>(r#"{"points":[{"x":0,"y":0}]}"#).is_err());
    }
}
