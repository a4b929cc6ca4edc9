/// Small numeric helpers shared by the cross-section tables

/// Index `i` of the interval with `x[i] <= x_new < x[i+1]`.
///
/// `x` must be sorted ascending with at least two points and `x_new` strictly
/// inside `[x[0], x[last])`.
fn bracket(x: &[f64], x_new: f64) -> usize {
    let mut low = 0usize;
    let mut high = x.len() - 1;
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x[mid] <= x_new {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Log-log interpolation with flat extrapolation at both ends.
///
/// All x values must be positive. A zero y value in a bracketing pair falls
/// back to linear interpolation for that interval, so tables that start at
/// threshold with σ = 0 can still be used.
pub fn interpolate_log_log(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }

    let idx = bracket(x, x_new);
    let (x1, x2) = (x[idx], x[idx + 1]);
    let (y1, y2) = (y[idx], y[idx + 1]);
    if y1 <= 0.0 || y2 <= 0.0 {
        return y1 + (x_new - x1) * (y2 - y1) / (x2 - x1);
    }
    let slope = (y2 / y1).ln() / (x2 / x1).ln();
    y1 * (x_new / x1).powf(slope)
}

/// `n` points spaced evenly in log between `start` and `stop` (inclusive).
pub fn log_spaced(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let (l0, l1) = (start.ln(), stop.ln());
            let step = (l1 - l0) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        (l0 + step * i as f64).exp()
                    }
                })
                .collect()
        }
    }
}
