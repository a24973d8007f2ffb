//! Pose covariance type.

use serde::{Deserialize, Serialize};

/// 3x3 covariance matrix for 2D pose uncertainty (x, y, theta).
///
/// Stored as row-major array: [xx, xy, xt, yx, yy, yt, tx, ty, tt]
/// where t = theta. Invariant: symmetric positive semi-definite; filter
/// updates re-symmetrize to counter floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance2D {
    /// Row-major 3x3 matrix data
    data: [f32; 9],
}

impl Covariance2D {
    /// Create a zero covariance matrix.
    #[inline]
    pub fn zero() -> Self {
        Self { data: [0.0; 9] }
    }

    /// Create a diagonal covariance matrix.
    ///
    /// Parameters are variances: xx = σ²_x, yy = σ²_y, tt = σ²_θ
    #[inline]
    pub fn diagonal(xx: f32, yy: f32, tt: f32) -> Self {
        Self {
            data: [xx, 0.0, 0.0, 0.0, yy, 0.0, 0.0, 0.0, tt],
        }
    }

    /// Create from row-major array.
    #[inline]
    pub fn from_array(data: [f32; 9]) -> Self {
        Self { data }
    }

    /// Get raw data as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32; 9] {
        &self.data
    }

    /// Sum of the diagonal (total variance).
    #[inline]
    pub fn trace(&self) -> f32 {
        self.data[0] + self.data[4] + self.data[8]
    }

    /// Average each off-diagonal pair to restore exact symmetry.
    #[inline]
    pub fn symmetrized(&self) -> Self {
        let d = &self.data;
        let xy = 0.5 * (d[1] + d[3]);
        let xt = 0.5 * (d[2] + d[6]);
        let yt = 0.5 * (d[5] + d[7]);
        Self {
            data: [d[0], xy, xt, xy, d[4], yt, xt, yt, d[8]],
        }
    }

    /// Expand into a row-major 6x6 pose covariance block.
    ///
    /// Only the planar entries are populated (x, y and the rotational
    /// z-axis rows/columns); the remaining entries stay zero.
    pub fn to_pose_covariance(&self) -> [f32; 36] {
        let d = &self.data;
        let mut out = [0.0; 36];
        out[0] = d[0]; // x-x
        out[1] = d[1]; // x-y
        out[5] = d[2]; // x-yaw
        out[6] = d[3]; // y-x
        out[7] = d[4]; // y-y
        out[11] = d[5]; // y-yaw
        out[30] = d[6]; // yaw-x
        out[31] = d[7]; // yaw-y
        out[35] = d[8]; // yaw-yaw
        out
    }
}

impl Default for Covariance2D {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_diagonal_and_trace() {
        let diag = Covariance2D::diagonal(0.1, 0.2, 0.05);
        assert_relative_eq!(diag.trace(), 0.35, epsilon = 1e-6);
        assert_eq!(Covariance2D::zero().trace(), 0.0);
    }

    #[test]
    fn test_symmetrized_averages_off_diagonals() {
        let m = Covariance2D::from_array([1.0, 0.2, 0.0, 0.4, 1.0, 0.6, 0.0, 0.8, 1.0]);
        let s = m.symmetrized();
        let d = s.as_slice();
        assert_relative_eq!(d[1], 0.3, epsilon = 1e-6);
        assert_relative_eq!(d[3], 0.3, epsilon = 1e-6);
        assert_relative_eq!(d[5], 0.7, epsilon = 1e-6);
        assert_relative_eq!(d[7], 0.7, epsilon = 1e-6);
        assert_relative_eq!(d[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(d[6], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_to_pose_covariance_mapping() {
        let m = Covariance2D::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let full = m.to_pose_covariance();
        assert_eq!(full[0], 1.0);
        assert_eq!(full[1], 2.0);
        assert_eq!(full[5], 3.0);
        assert_eq!(full[6], 4.0);
        assert_eq!(full[7], 5.0);
        assert_eq!(full[11], 6.0);
        assert_eq!(full[30], 7.0);
        assert_eq!(full[31], 8.0);
        assert_eq!(full[35], 9.0);
        // Everything outside the planar block stays zero.
        let populated = [0usize, 1, 5, 6, 7, 11, 30, 31, 35];
        for (i, &v) in full.iter().enumerate() {
            if !populated.contains(&i) {
                assert_eq!(v, 0.0, "index {} should be zero", i);
            }
        }
    }
}
