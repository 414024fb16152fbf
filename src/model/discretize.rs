//! Exact zero-order-hold discretization.
//!
//! With inputs held constant over a step of length Δt, the continuous system
//! `ẋ = A·x + B·u + E·d` maps exactly onto
//!
//! ```text
//! exp([[A, B, E], [0, 0, 0]]·Δt) = [[Ad, Bd, Ed], [0, I, 0]]
//! ```
//!
//! The same rule is applied to every state, storage included.

use nalgebra::DMatrix;

/// Discrete-time (A, B, E) for a continuous-time system and step `dt` (same time unit)
pub fn zero_order_hold(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    e: &DMatrix<f64>,
    dt: f64,
) -> (DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
    let n = a.nrows();
    let m = b.ncols();
    let p = e.ncols();
    let size = n + m + p;

    let mut augmented = DMatrix::<f64>::zeros(size, size);
    augmented.view_mut((0, 0), (n, n)).copy_from(a);
    augmented.view_mut((0, n), (n, m)).copy_from(b);
    augmented.view_mut((0, n + m), (n, p)).copy_from(e);
    augmented *= dt;

    let exponential = augmented.exp();

    (
        exponential.view((0, 0), (n, n)).into_owned(),
        exponential.view((0, n), (n, m)).into_owned(),
        exponential.view((0, n + m), (n, p)).into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_first_order_lag() {
        // C·dT/dt = -H·T + u, tau = C/H
        let c = 2.0;
        let h = 0.5;
        let a = DMatrix::from_element(1, 1, -h / c);
        let b = DMatrix::from_element(1, 1, 1.0 / c);
        let e = DMatrix::from_element(1, 1, h / c);
        let dt = 1.5;

        let (ad, bd, ed) = zero_order_hold(&a, &b, &e, dt);

        let decay = (-h / c * dt).exp();
        assert!((ad[(0, 0)] - decay).abs() < 1e-12);
        assert!((bd[(0, 0)] - (1.0 - decay) / h).abs() < 1e-12);
        assert!((ed[(0, 0)] - (1.0 - decay)).abs() < 1e-12);
    }

    #[test]
    fn test_pure_integrator() {
        let a = DMatrix::zeros(1, 1);
        let b = DMatrix::from_row_slice(1, 2, &[0.9, -1.0]);
        let e = DMatrix::zeros(1, 0);

        let (ad, bd, ed) = zero_order_hold(&a, &b, &e, 0.5);

        assert!((ad[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((bd[(0, 0)] - 0.45).abs() < 1e-12);
        assert!((bd[(0, 1)] + 0.5).abs() < 1e-12);
        assert_eq!(ed.shape(), (1, 0));
    }

    #[test]
    fn test_steady_state_preserved() {
        // Two coupled nodes with ambient at 30: constant 30 everywhere is a fixed point
        let a = DMatrix::from_row_slice(2, 2, &[-3.0, 1.0, 2.0, -2.0]);
        let b = DMatrix::zeros(2, 0);
        let e = DMatrix::from_row_slice(2, 1, &[2.0, 0.0]);

        let (ad, _, ed) = zero_order_hold(&a, &b, &e, 0.25);

        let x = nalgebra::DVector::from_element(2, 30.0);
        let d = nalgebra::DVector::from_element(1, 30.0);
        let next = &ad * &x + &ed * &d;
        assert!((next - x).norm() < 1e-9);
    }
}
