//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// The return value `r` satisfies `0.0 <= r < rhs.abs()` in most cases, but
/// floating point round-off can give `r == rhs.abs()` when `lhs` is much
/// smaller than `rhs.abs()` in magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t: T = pi_t + pi_t;

    // Map into [0, 2pi) then shift down, pushing -pi onto +pi
    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `a` to `b`.
///
/// The result is in (-pi, pi] and satisfies `wrap_to_pi(a + d) == wrap_to_pi(b)`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_to_pi(b - a)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_to_pi() {
        assert!((wrap_to_pi(0f64)).abs() < EPS);
        assert!((wrap_to_pi(PI) - PI).abs() < EPS);
        assert!((wrap_to_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_to_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_to_pi(-5.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_to_pi(4.0 * PI)).abs() < EPS);
    }

    #[test]
    fn test_get_ang_dist() {
        assert!((get_ang_dist(1f64, 2f64) - 1.0).abs() < EPS);
        assert!((get_ang_dist(2f64, 1f64) + 1.0).abs() < EPS);
        assert!((get_ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < EPS);
        assert!((get_ang_dist(-PI + 0.1, PI - 0.1) + 0.2).abs() < EPS);
    }
}
