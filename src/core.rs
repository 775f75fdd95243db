use std::ops::{Index, IndexMut};

/// used for colors
pub type RgbD = glam::f64::DVec3;
/// used for colors
pub type RgbF = glam::f32::Vec3;

/// used for direction vectors and positions
pub type Vec3d = glam::f64::DVec3;
/// used for pairs of uniform random numbers
pub type Vec2d = glam::f64::DVec2;

/// Number of spherical harmonics coefficients for bands `l = 0, 1, 2`
pub const N_COEFFS: usize = 9;

/// Highest spherical harmonics band that is evaluated
pub const MAX_BAND: usize = 2;

/// Flat index of the coefficient of band `l` and order `m` (`-l <= m <= l`)
#[must_use]
pub const fn sh_index(l: usize, m: isize) -> usize {
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    {
        ((l * (l + 1)) as isize + m) as usize
    }
}

/// A vector of spherical harmonics coefficients ordered by `(l, m)`.
///
/// The same representation is used for per vertex transfer vectors and for the light vector.
/// Reflected radiance is (up to clamping) the dot product of the two.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ShCoeffs(pub [f64; N_COEFFS]);

impl ShCoeffs {
    /// All coefficients zero
    pub const ZERO: Self = Self([0.0; N_COEFFS]);

    #[must_use]
    pub const fn new(coeffs: [f64; N_COEFFS]) -> Self {
        Self(coeffs)
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        for c in &mut self.0 {
            *c *= factor;
        }
        self
    }

    /// Adds `weight * other` to `self`
    pub fn add_scaled(&mut self, other: &Self, weight: f64) {
        for (c, o) in self.0.iter_mut().zip(other.0.iter()) {
            *c = o.mul_add(weight, *c);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// `false` if any coefficient is NaN or infinite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl Index<usize> for ShCoeffs {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for ShCoeffs {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<[f64; N_COEFFS]> for ShCoeffs {
    fn from(value: [f64; N_COEFFS]) -> Self {
        Self(value)
    }
}

impl<'a> IntoIterator for &'a ShCoeffs {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{sh_index, ShCoeffs};

    #[test]
    fn band_indexing() {
        assert_eq!(sh_index(0, 0), 0);
        assert_eq!(sh_index(1, -1), 1);
        assert_eq!(sh_index(1, 0), 2);
        assert_eq!(sh_index(1, 1), 3);
        assert_eq!(sh_index(2, -2), 4);
        assert_eq!(sh_index(2, 0), 6);
        assert_eq!(sh_index(2, 2), 8);
    }

    #[test]
    fn dot_and_accumulate() {
        let a = ShCoeffs::new([1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let mut b = ShCoeffs::ZERO;
        b.add_scaled(&a, 2.0);
        assert!((a.dot(&b) - 28.0).abs() < 1e-12);
        assert!((b.scaled(0.5)[6] - 3.0).abs() < 1e-12);
    }
}
