//! Sorted interpolation table mapping one scalar measurement to another.
//!
//! Used standalone (resistance → temperature) and as the breakpoint
//! table of the bang-bang power controller (temperature → power).

use std::cmp::Ordering;

/// An ordered set of (x, y) points, kept sorted ascending by x.
///
/// Queries between the recorded extremes interpolate linearly between
/// the bracketing points; queries outside extrapolate along the nearest
/// edge segment's slope.
///
/// Insertion is append + stable sort, so duplicate x values are
/// preserved in insertion order; callers that want replacement must
/// avoid adding duplicate x.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationCurve {
    points: Vec<(f64, f64)>,
}

impl CalibrationCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut curve = Self::new();
        for (x, y) in points {
            curve.add_point(x, y);
        }
        curve
    }

    /// Insert a point and re-sort by x. Returns self for chaining.
    pub fn add_point(&mut self, x: f64, y: f64) -> &mut Self {
        self.points.push((x, y));
        self.points
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        self
    }

    /// Interpolated or extrapolated y for the given x.
    ///
    /// Callers must ensure at least two points exist; with one point the
    /// result degenerates to that point's y and with none it is NaN.
    pub fn estimate(&self, x: f64) -> f64 {
        match self.points.len() {
            0 => f64::NAN,
            1 => self.points[0].1,
            _ => {
                // Exact hits return the stored y, not an interpolation of it.
                if let Some(&(_, y)) = self.points.iter().find(|p| p.0 == x) {
                    return y;
                }
                let (x0, y0, x1, y1) = match self.segment(x) {
                    Some(((x0, y0), (x1, y1))) => (x0, y0, x1, y1),
                    None => return f64::NAN,
                };
                if (x1 - x0).abs() < f64::EPSILON {
                    return y0;
                }
                y0 + (x - x0) * (y1 - y0) / (x1 - x0)
            }
        }
    }

    /// The segment used to evaluate x: the bracketing pair inside the
    /// recorded range, or the nearest edge pair outside it.
    pub fn segment(&self, x: f64) -> Option<((f64, f64), (f64, f64))> {
        if self.points.len() < 2 {
            return None;
        }
        let window = self
            .points
            .windows(2)
            .find(|w| x <= w[1].0)
            .unwrap_or(&self.points[self.points.len() - 2..]);
        Some((window[0], window[1]))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<(f64, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Discard the whole curve.
    pub fn reset(&mut self) {
        self.points.clear();
    }
}
