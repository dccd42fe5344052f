//! Arc-length parameterization by uniform re-sampling.
//!
//! Every segment is evaluated at `subdivisions` uniform parameter steps and the Euclidean
//! distances between consecutive samples are accumulated. Distance lookups interpolate
//! linearly between the two bracketing samples, so precision is bounded by the subdivision
//! count. Preview and export must share the same [`SamplerOpts`] to agree bit for bit.

use crate::{
    foundation::core::Point,
    foundation::error::{GlideError, GlideResult},
    geometry::curve::Curve,
};

pub const DEFAULT_SUBDIVISIONS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SamplerOpts {
    /// Uniform parameter steps per segment.
    pub subdivisions: usize,
}

impl SamplerOpts {
    pub fn new(subdivisions: usize) -> GlideResult<Self> {
        if subdivisions == 0 {
            return Err(GlideError::validation("arc-length subdivisions must be > 0"));
        }
        Ok(Self { subdivisions })
    }
}

impl Default for SamplerOpts {
    fn default() -> Self {
        Self {
            subdivisions: DEFAULT_SUBDIVISIONS,
        }
    }
}

/// Sampled distance table for one curve.
#[derive(Clone, Debug)]
pub struct ArcLengthSampler {
    first: Point,
    last: Point,
    samples: Vec<Point>,
    /// `cumulative[k]` is the polyline length from `samples[0]` to `samples[k]`.
    cumulative: Vec<f64>,
    subdivisions: usize,
}

impl ArcLengthSampler {
    pub fn new(curve: &Curve, opts: SamplerOpts) -> Self {
        let n = opts.subdivisions.max(1);
        let segments = curve.segment_count();
        let mut samples = Vec::with_capacity(segments * n + 1);
        let mut cumulative = Vec::with_capacity(segments * n + 1);

        let mut acc = 0.0;
        for i in 0..segments {
            let Some(seg) = curve.segment(i) else {
                continue;
            };
            use kurbo::ParamCurve as _;

            let mut prev = seg.eval(0.0);
            if i == 0 {
                samples.push(prev);
                cumulative.push(0.0);
            }
            for j in 1..=n {
                let t = j as f64 / n as f64;
                let p = seg.eval(t);
                acc += prev.distance(p);
                samples.push(p);
                cumulative.push(acc);
                prev = p;
            }
        }

        Self {
            first: curve.first_point(),
            last: curve.last_point(),
            samples,
            cumulative,
            subdivisions: n,
        }
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Position `distance` units along the curve.
    ///
    /// `distance <= 0` yields the first control point and `distance >= total_length()` the last.
    pub fn position_at_distance(&self, distance: f64) -> Point {
        if distance.is_nan() || distance <= 0.0 {
            return self.first;
        }
        if distance >= self.total_length() {
            return self.last;
        }

        let k = self.cumulative.partition_point(|&c| c < distance);
        // cumulative[0] == 0 < distance and cumulative[last] > distance.
        let (a, b) = (self.samples[k - 1], self.samples[k]);
        let step = self.cumulative[k] - self.cumulative[k - 1];
        let ratio = (distance - self.cumulative[k - 1]) / step;
        a.lerp(b, ratio)
    }

    /// Position at `fraction` of the total length.
    pub fn position_at_fraction(&self, fraction: f64) -> Point {
        self.position_at_distance(fraction * self.total_length())
    }

    pub fn segment_count(&self) -> usize {
        self.cumulative.len().saturating_sub(1) / self.subdivisions
    }

    /// Sampled length of every segment, in order.
    pub fn segment_lengths(&self) -> Vec<f64> {
        (0..self.segment_count())
            .map(|i| self.segment_length(i))
            .collect()
    }

    pub fn segment_length(&self, segment: usize) -> f64 {
        let (start, end) = self.segment_span(segment);
        self.cumulative[end] - self.cumulative[start]
    }

    /// Index and sampled length of the longest segment; the first one wins ties.
    pub fn longest_segment(&self) -> (usize, f64) {
        self.segment_lengths()
            .into_iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, len)| {
                if len > best.1 { (i, len) } else { best }
            })
    }

    /// Point halfway along `segment` by sampled arc length.
    pub fn segment_midpoint(&self, segment: usize) -> Point {
        let (start, end) = self.segment_span(segment);
        if self.cumulative[end] <= self.cumulative[start] {
            return self.samples[start];
        }
        let target = (self.cumulative[start] + self.cumulative[end]) / 2.0;
        self.position_at_distance(target)
    }

    fn segment_span(&self, segment: usize) -> (usize, usize) {
        let last = self.cumulative.len().saturating_sub(1);
        let start = (segment * self.subdivisions).min(last);
        let end = ((segment + 1) * self.subdivisions).min(last);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight() -> Curve {
        Curve::line(Point::new(0.0, 0.0), Point::new(100.0, 0.0)).unwrap()
    }

    #[test]
    fn straight_line_length_and_midpoint() {
        let s = ArcLengthSampler::new(&straight(), SamplerOpts::default());
        assert!((s.total_length() - 100.0).abs() < 1e-9);
        let mid = s.position_at_distance(50.0);
        assert!((mid.x - 50.0).abs() < 1e-9);
        assert_eq!(mid.y, 0.0);
    }

    #[test]
    fn distance_is_clamped_at_both_ends() {
        let c = Curve::new(
            vec![
                Point::new(10.0, 10.0),
                Point::new(50.0, 80.0),
                Point::new(90.0, 20.0),
            ],
            2.0,
        )
        .unwrap();
        let s = ArcLengthSampler::new(&c, SamplerOpts::default());
        assert_eq!(s.position_at_distance(-5.0), c.first_point());
        assert_eq!(s.position_at_distance(0.0), c.first_point());
        assert_eq!(s.position_at_distance(f64::NAN), c.first_point());
        assert_eq!(s.position_at_distance(s.total_length()), c.last_point());
        assert_eq!(s.position_at_distance(1e9), c.last_point());
    }

    #[test]
    fn sample_table_size_tracks_subdivisions() {
        let c = Curve::new(
            vec![Point::ORIGIN, Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
            0.0,
        )
        .unwrap();
        let s = ArcLengthSampler::new(&c, SamplerOpts::new(8).unwrap());
        assert_eq!(s.samples.len(), 2 * 8 + 1);
        assert_eq!(s.segment_count(), 2);
        assert!(SamplerOpts::new(0).is_err());
    }

    #[test]
    fn segment_lengths_sum_to_total() {
        let c = Curve::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(30.0, 40.0),
                Point::new(60.0, 0.0),
                Point::new(200.0, 10.0),
            ],
            1.5,
        )
        .unwrap();
        let s = ArcLengthSampler::new(&c, SamplerOpts::default());
        let sum: f64 = s.segment_lengths().iter().sum();
        assert!((sum - s.total_length()).abs() < 1e-9);
        assert_eq!(s.longest_segment().0, 2);
    }

    #[test]
    fn uniform_speed_on_polyline() {
        // Tension 0 turns each segment into a straight Bézier with clustered parameters;
        // distance lookups must still be uniform.
        let c = Curve::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)],
            0.0,
        )
        .unwrap();
        let s = ArcLengthSampler::new(&c, SamplerOpts::default());
        assert!((s.total_length() - 200.0).abs() < 1e-9);
        let p = s.position_at_distance(150.0);
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-6);
        let q = s.position_at_fraction(0.25);
        assert!((q.x - 50.0).abs() < 1e-6);
    }

    #[test]
    fn coincident_points_do_not_divide_by_zero() {
        let c = Curve::new(vec![Point::new(5.0, 5.0), Point::new(5.0, 5.0)], 0.0).unwrap();
        let s = ArcLengthSampler::new(&c, SamplerOpts::default());
        assert_eq!(s.total_length(), 0.0);
        assert_eq!(s.position_at_distance(0.0), Point::new(5.0, 5.0));
        assert_eq!(s.position_at_distance(1.0), Point::new(5.0, 5.0));
        assert_eq!(s.segment_midpoint(0), Point::new(5.0, 5.0));
    }
}
