//! Adaptive Simpson quadrature.
//!
//! The dark brem cross section is a product of two one-dimensional integrals
//! with smooth integrands, so a recursive Simpson rule with a Richardson
//! correction is enough. The form-factor integral spans many decades of
//! momentum transfer and is done in `ln t` through [`integrate_log`].

/// Tolerances for [`integrate`].
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
    pub max_depth: u32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 1e-12,
            relative: 1e-8,
            max_depth: 40,
        }
    }
}

struct Panel {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

fn refine<F: Fn(f64) -> f64>(f: &F, panel: Panel, eps: f64, depth: u32) -> f64 {
    let Panel { a, b, fa, fm, fb, whole } = panel;
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;

    if depth == 0 || delta.abs() <= 15.0 * eps {
        return left + right + delta / 15.0;
    }
    refine(
        f,
        Panel { a, b: m, fa, fm: flm, fb: fm, whole: left },
        0.5 * eps,
        depth - 1,
    ) + refine(
        f,
        Panel { a: m, b, fa: fm, fm: frm, fb, whole: right },
        0.5 * eps,
        depth - 1,
    )
}

/// Integrate `f` over `[a, b]`.
///
/// Returns 0 for an empty or reversed interval. The error target is
/// `max(absolute, relative * |coarse estimate|)`.
pub fn integrate<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, tol: Tolerance) -> f64 {
    if !(b > a) {
        return 0.0;
    }

    // Seed with a few panels so narrow features are not missed by the first
    // three-point estimate
    const SEED_PANELS: usize = 8;
    let h = (b - a) / SEED_PANELS as f64;
    let mut panels = Vec::with_capacity(SEED_PANELS);
    let mut coarse = 0.0;
    for i in 0..SEED_PANELS {
        let pa = a + h * i as f64;
        let pb = if i == SEED_PANELS - 1 { b } else { pa + h };
        let (fa, fm, fb) = (f(pa), f(0.5 * (pa + pb)), f(pb));
        let whole = simpson(pa, pb, fa, fm, fb);
        coarse += whole;
        panels.push(Panel { a: pa, b: pb, fa, fm, fb, whole });
    }

    let eps = tol.absolute.max(tol.relative * coarse.abs()) / SEED_PANELS as f64;
    panels
        .into_iter()
        .map(|p| refine(&f, p, eps, tol.max_depth))
        .sum()
}

/// Integrate `f(t)` over `[t_min, t_max]` using the substitution `t = e^u`.
///
/// Both limits must be positive.
pub fn integrate_log<F: Fn(f64) -> f64>(f: F, t_min: f64, t_max: f64, tol: Tolerance) -> f64 {
    if !(t_min > 0.0) || !(t_max > t_min) {
        return 0.0;
    }
    integrate(
        |u| {
            let t = u.exp();
            f(t) * t
        },
        t_min.ln(),
        t_max.ln(),
        tol,
    )
}
