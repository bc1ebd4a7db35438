//! Offline numeric fitting: golden-section minimum search, linear
//! regression, and the first-order step-response estimator used by
//! calibration commands.

use crate::error::FitError;

/// Fraction of the initial-to-final range that defines the step
/// response threshold (1 − 1/e).
const STEP_THRESHOLD_FRACTION: f64 = 0.632;

/// Minimize a unimodal scalar function on [lo, hi] by golden-section
/// search.
///
/// The exact algorithm is not load-bearing for correctness, only for
/// fit quality; callers treat this as a black box behind the bounds.
pub fn golden_section_min<F>(f: F, mut lo: f64, mut hi: f64, iterations: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    const INVPHI: f64 = 0.618_033_988_749_894_8;

    let mut a = hi - INVPHI * (hi - lo);
    let mut b = lo + INVPHI * (hi - lo);
    let mut fa = f(a);
    let mut fb = f(b);

    for _ in 0..iterations {
        if fa < fb {
            hi = b;
            b = a;
            fb = fa;
            a = hi - INVPHI * (hi - lo);
            fa = f(a);
        } else {
            lo = a;
            a = b;
            fa = fb;
            b = lo + INVPHI * (hi - lo);
            fb = f(b);
        }
    }

    0.5 * (lo + hi)
}

/// Ordinary least-squares line through the points.
///
/// Returns (slope, intercept), or `None` with fewer than two points or
/// a degenerate x spread.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sx: f64 = points.iter().map(|p| p.0).sum();
    let sy: f64 = points.iter().map(|p| p.1).sum();
    let sxx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sxy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;
    Some((slope, intercept))
}

/// Result of fitting a first-order thermal model to step-response data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResponseFit {
    /// Time constant (s).
    pub tau: f64,
    /// Step magnitude (°C), `exp(intercept)` of the log-linear fit.
    pub magnitude: f64,
    /// Thermal capacitance `tau / resistance`, if a thermal resistance
    /// was supplied (J/°C).
    pub capacitance: Option<f64>,
}

/// Fit a first-order step response `T(t) = final − magnitude·e^(−t/τ)`.
///
/// Locates the 63.2%-of-range crossing, log-linearizes the remaining
/// distance to `final` for all points before it, and regresses against
/// time. Fails when fewer than two usable points precede the crossing.
pub fn step_response(
    series: &[(f64, f64)],
    initial: f64,
    final_value: f64,
    resistance: Option<f64>,
) -> Result<StepResponseFit, FitError> {
    let rising = final_value >= initial;
    let threshold = initial + STEP_THRESHOLD_FRACTION * (final_value - initial);

    let crossing = series
        .iter()
        .position(|&(_, v)| if rising { v >= threshold } else { v <= threshold })
        .ok_or(FitError::NoCrossing)?;

    let mut logs = Vec::with_capacity(crossing);
    for &(t, v) in &series[..crossing] {
        let remaining = if rising { final_value - v } else { v - final_value };
        if remaining > 0.0 {
            logs.push((t, remaining.ln()));
        }
    }

    if logs.len() < 2 {
        return Err(FitError::InsufficientData {
            needed: 2,
            available: logs.len(),
        });
    }

    let (slope, intercept) = linear_regression(&logs).ok_or(FitError::DegenerateFit)?;
    if slope >= 0.0 {
        return Err(FitError::DegenerateFit);
    }

    let tau = -1.0 / slope;
    Ok(StepResponseFit {
        tau,
        magnitude: intercept.exp(),
        capacitance: resistance.map(|r| tau / r),
    })
}
