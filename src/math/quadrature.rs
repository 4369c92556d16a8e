//! Gauss-Legendre integration used for lengths that have no closed form,
//! such as an arc seen through a flatten transform (an ellipse).

/// Abscissae of the 5-point Gauss-Legendre rule on `[-1, 1]`.
const NODES: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683,
    0.0,
    0.538_469_310_105_683,
    0.906_179_845_938_664,
];

/// Weights matching [`NODES`].
const WEIGHTS: [f64; 5] = [
    0.236_926_885_056_189,
    0.478_628_670_499_366,
    0.568_888_888_888_889,
    0.478_628_670_499_366,
    0.236_926_885_056_189,
];

/// Integrates `f` over `[a, b]` with `intervals` composite 5-point
/// Gauss-Legendre panels. `b < a` yields the negated integral.
pub fn integrate<F>(a: f64, b: f64, intervals: u32, f: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let intervals = intervals.max(1);
    let h = (b - a) / f64::from(intervals);
    let mut sum = 0.0;
    for i in 0..intervals {
        let x0 = a + h * f64::from(i);
        let mid = x0 + 0.5 * h;
        let half = 0.5 * h;
        for (node, weight) in NODES.iter().zip(WEIGHTS.iter()) {
            sum += weight * f(mid + half * node);
        }
    }
    sum * 0.5 * h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_polynomial_exactly() {
        // x^4 on [0, 2] = 32 / 5
        let v = integrate(0.0, 2.0, 1, |x| x.powi(4));
        assert!((v - 6.4).abs() < 1e-12);
    }

    #[test]
    fn reversed_interval_negates() {
        let v = integrate(1.0, 0.0, 4, |x| x);
        assert!((v + 0.5).abs() < 1e-12);
    }

    #[test]
    fn integrates_cosine() {
        let v = integrate(0.0, std::f64::consts::FRAC_PI_2, 4, f64::cos);
        assert!((v - 1.0).abs() < 1e-10);
    }
}
