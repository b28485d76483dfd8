//! Probability primitives
//!
//! Fixed-coefficient polynomial approximations. Reports produced elsewhere were
//! computed with exactly these formulas, so the coefficients and evaluation order
//! must not be swapped for a numerical library.

/// Gauss error function using the Abramowitz and Stegun formula 7.1.26
///
/// Accuracy: |error| < 1.5e-7
pub fn erf(x: f64) -> f64 {
    // Constants for the approximation
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    // sign(0) = 0 keeps erf(0) exactly 0
    if x == 0.0 {
        return 0.0;
    }
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    // Horner's method for polynomial evaluation
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal CDF, Φ(x) = 0.5 * (1 + erf(x / √2))
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Inverse of the standard normal CDF (Abramowitz and Stegun 26.2.23)
///
/// Returns 0 outside the open interval (0, 1). Accuracy: |error| < 4.5e-4
pub fn normal_inverse_cdf(p: f64) -> f64 {
    const C0: f64 = 2.515517;
    const C1: f64 = 0.802853;
    const C2: f64 = 0.010328;
    const D1: f64 = 1.432788;
    const D2: f64 = 0.189269;
    const D3: f64 = 0.001308;

    if p <= 0.0 || p >= 1.0 || p.is_nan() {
        return 0.0;
    }

    let q = p.min(1.0 - p);
    let t = (-2.0 * q.ln()).sqrt();
    let z = t - ((C2 * t + C1) * t + C0) / (((D3 * t + D2) * t + D1) * t + 1.0);

    if p <= 0.5 {
        -z
    } else {
        z
    }
}

/// Two-sided critical value for a confidence level, e.g. ≈1.96 for 0.95
pub fn critical_value(confidence_level: f64) -> f64 {
    normal_inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0)
}

/// Student-t CDF, coarse large-df approximation
///
/// `0.5 + x(1 + x²/4df)·e^(-x²/2)/√(2π)` with `x = t/√df`. This is not a real
/// t distribution: it peaks well below 1, so p-values derived from it are
/// conservative. Result is clamped to [0, 1].
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    if df.is_nan() || df <= 0.0 || !t.is_finite() {
        return 0.5;
    }
    let x = t / df.sqrt();
    let density = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let cdf = 0.5 + x * (1.0 + x * x / (4.0 * df)) * density;
    cdf.clamp(0.0, 1.0)
}

/// Natural log of the truncated factorial over reals: ln(n·(n-1)·…) stopping at 1
///
/// Only exact for integer n; half-integers are truncated at 1 (e.g. 2.5! = 3.75).
/// Summed iteratively in log space, so large n stays finite.
pub fn ln_factorial(n: f64) -> f64 {
    if !n.is_finite() {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    let mut k = n;
    while k > 1.0 {
        sum += k.ln();
        k -= 1.0;
    }
    sum
}
