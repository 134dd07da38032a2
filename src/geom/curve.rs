use super::core::{Point3, Tolerance, Vec3};

/// Degree of every spline built by the rig nodes.
pub const DEGREE: usize = 3;
/// Order (`degree + 1`) of every spline built by the rig nodes.
pub const ORDER: usize = DEGREE + 1;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("b-spline degree must be >= 1")]
    InvalidDegree,
    #[error("b-spline of degree {degree} requires at least {required} control points, got {actual}")]
    TooFewControlPoints {
        degree: usize,
        required: usize,
        actual: usize,
    },
    #[error("knot vector length must be {expected}, got {actual}")]
    KnotCountMismatch { expected: usize, actual: usize },
    #[error("knot vector must be non-decreasing")]
    DecreasingKnots,
    #[error("control point count changed from {expected} to {actual} without rebuilding knots")]
    ControlPointCountChanged { expected: usize, actual: usize },
    #[error("parameter {t} lies outside the curve domain [{lower}, {upper}]")]
    ParameterOutOfDomain { t: f64, lower: f64, upper: f64 },
    #[error("parameterization requires at least 2 samples, got {0}")]
    TooFewSamples(usize),
}

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn derivative_at(&self, t: f64) -> Vec3;

    #[must_use]
    fn second_derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let h = 1e-4 * (b - a);
        if !h.is_finite() || h == 0.0 {
            return Vec3::ZERO;
        }
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        (self.derivative_at(t1) - self.derivative_at(t0)) / (t1 - t0)
    }

    /// `|d1 × d2| / |d1|³`, `None` where the first derivative vanishes.
    #[must_use]
    fn curvature_at(&self, t: f64) -> Option<f64> {
        let d1 = self.derivative_at(t);
        let d2 = self.second_derivative_at(t);
        let denom = d1.length();
        if denom <= Tolerance::ZERO_LENGTH.eps || !denom.is_finite() {
            return None;
        }
        let k = d1.cross(d2).length() / (denom * denom * denom);
        k.is_finite().then_some(k)
    }

    #[must_use]
    fn tangent_at(&self, t: f64) -> Option<Vec3> {
        self.derivative_at(t).normalized()
    }
}

/// Non-rational B-spline curve evaluated with de Boor's algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    degree: usize,
    control_points: Vec<Point3>,
    knots: Vec<f64>,
}

impl BSplineCurve {
    pub fn new(
        degree: usize,
        control_points: Vec<Point3>,
        knots: Vec<f64>,
    ) -> Result<Self, CurveError> {
        if degree == 0 {
            return Err(CurveError::InvalidDegree);
        }
        if control_points.len() < degree + 1 {
            return Err(CurveError::TooFewControlPoints {
                degree,
                required: degree + 1,
                actual: control_points.len(),
            });
        }
        let expected = control_points.len() + degree + 1;
        if knots.len() != expected {
            return Err(CurveError::KnotCountMismatch {
                expected,
                actual: knots.len(),
            });
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(CurveError::DecreasingKnots);
        }

        Ok(Self {
            degree,
            control_points,
            knots,
        })
    }

    /// Cubic curve with a clamped knot vector, interpolating its end points.
    pub fn clamped(control_points: Vec<Point3>) -> Result<Self, CurveError> {
        let n = control_points.len().saturating_sub(1);
        Self::new(DEGREE, control_points, clamped_knot_vector(n, DEGREE))
    }

    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Replace the control points while keeping the knot vector.
    pub fn set_control_points(&mut self, control_points: Vec<Point3>) -> Result<(), CurveError> {
        if control_points.len() != self.control_points.len() {
            return Err(CurveError::ControlPointCountChanged {
                expected: self.control_points.len(),
                actual: control_points.len(),
            });
        }
        self.control_points = control_points;
        Ok(())
    }

    /// Index `i` with `knots[i] <= t < knots[i + 1]`, restricted to `[degree, n]`.
    #[must_use]
    pub fn knot_interval(&self, t: f64) -> usize {
        find_span(self.control_points.len() - 1, self.degree, t, &self.knots)
    }

    /// Evaluate the curve, failing outside `[knots[degree], knots[n + 1]]`.
    pub fn evaluate(&self, t: f64) -> Result<Point3, CurveError> {
        self.check_domain(t)?;
        Ok(self.point_at(t))
    }

    /// `order`-th derivative; orders above the degree are identically zero.
    pub fn derivative(&self, order: usize, t: f64) -> Result<Vec3, CurveError> {
        self.check_domain(t)?;
        Ok(self.derivative_unchecked(order, t))
    }

    fn check_domain(&self, t: f64) -> Result<(), CurveError> {
        let (lower, upper) = self.domain();
        let slack = Tolerance::DEFAULT.eps * (upper - lower).abs().max(1.0);
        if !t.is_finite() || t < lower - slack || t > upper + slack {
            return Err(CurveError::ParameterOutOfDomain { t, lower, upper });
        }
        Ok(())
    }

    fn derivative_unchecked(&self, order: usize, t: f64) -> Vec3 {
        let p = self.degree;
        if order > p {
            return Vec3::ZERO;
        }
        let (lower, upper) = self.domain();
        let t = t.clamp(lower, upper);
        let span = self.knot_interval(t);
        let knots = &self.knots;

        // Local control points P[span - p ..= span]; entry j holds global index span - p + j.
        let mut d: Vec<Vec3> = (0..=p)
            .map(|j| self.control_points[span - p + j].to_vec3())
            .collect();

        for level in 1..=order {
            let q = p - level + 1;
            for j in (level..=p).rev() {
                let i = span - p + j;
                let denom = knots[i + q] - knots[i];
                let scale = if denom == 0.0 { 0.0 } else { q as f64 / denom };
                d[j] = (d[j] - d[j - 1]) * scale;
            }
        }

        let q = p - order;
        let mut local: Vec<Vec3> = d[order..].to_vec();
        de_boor(&mut local, span, q, t, knots);
        local[q]
    }
}

impl Curve3 for BSplineCurve {
    fn point_at(&self, t: f64) -> Point3 {
        let (lower, upper) = self.domain();
        let t = t.clamp(lower, upper);
        let span = self.knot_interval(t);
        let p = self.degree;
        let mut d: Vec<Vec3> = (0..=p)
            .map(|j| self.control_points[span - p + j].to_vec3())
            .collect();
        de_boor(&mut d, span, p, t, &self.knots);
        Point3::from(d[p])
    }

    fn domain(&self) -> (f64, f64) {
        let n = self.control_points.len() - 1;
        (self.knots[self.degree], self.knots[n + 1])
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        self.derivative_unchecked(1, t)
    }

    fn second_derivative_at(&self, t: f64) -> Vec3 {
        self.derivative_unchecked(2, t)
    }
}

/// Clamped open-uniform knot vector for control points `0..=n`.
///
/// The first and last `degree + 1` knots repeat; interior knots are uniform in `[0, 1]`.
#[must_use]
pub fn clamped_knot_vector(n: usize, degree: usize) -> Vec<f64> {
    let len = n + degree + 2;
    let interior_spans = (n + 1).saturating_sub(degree).max(1) as f64;
    (0..len)
        .map(|i| {
            if i <= degree {
                0.0
            } else if i > n {
                1.0
            } else {
                (i - degree) as f64 / interior_spans
            }
        })
        .collect()
}

/// Uniform knot vector without boundary multiplicity, used for wrapped curves.
#[must_use]
pub fn unclamped_knot_vector(n: usize, degree: usize) -> Vec<f64> {
    let len = n + degree + 2;
    let last = (len - 1) as f64;
    (0..len).map(|i| i as f64 / last).collect()
}

fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        // Skip empty leading intervals so repeated boundary knots resolve forward.
        let mut span = p;
        while span < n && knots[span + 1] <= u {
            span += 1;
        }
        return span;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

fn de_boor(d: &mut [Vec3], span: usize, p: usize, u: f64, knots: &[f64]) {
    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = span - p + j;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}
