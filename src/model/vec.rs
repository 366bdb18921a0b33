//! Minimal 3-vector helpers.
//!
//! Positions, forces, and lattice vectors are plain `[f64; 3]` arrays
//! throughout the crate. This module collects the handful of operations
//! the geometry and estimator code need.

/// A 3-component vector. Units depend on context (Å for positions,
/// eV/Å for forces).
pub type Vec3 = [f64; 3];

/// Dot product `a · b`.
#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Componentwise difference `a - b`.
#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean norm `‖a‖`.
#[inline]
pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product() {
        assert_eq!(dot([1.0, 2.0, 3.0], [4.0, -5.0, 6.0]), 12.0);
        assert_eq!(dot([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), 0.0);
    }

    #[test]
    fn componentwise_difference() {
        assert_eq!(sub([1.0, 2.0, 3.0], [0.5, 2.0, 4.0]), [0.5, 0.0, -1.0]);
    }

    #[test]
    fn euclidean_norm() {
        assert_eq!(norm([3.0, 4.0, 0.0]), 5.0);
        assert_eq!(norm([0.0, 0.0, 0.0]), 0.0);
    }
}
