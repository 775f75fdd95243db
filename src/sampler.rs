//! Uniform sphere sampling for the Monte Carlo transfer integration
//!
//! A [`SampleSet`] is drawn once per precomputation pass and shared by every vertex. The noise
//! is therefore correlated across vertices which keeps relative comparisons between vertices
//! stable even for low sample counts.
use std::f64::consts;

use crate::{Vec2d, Vec3d};

/// Probability density of every direction returned by [`square_to_uniform_sphere`]
pub const UNIFORM_SPHERE_PDF: f64 = 1.0 / (4.0 * consts::PI);

/// Maps a point of the unit square onto the unit sphere with an area preserving mapping.
/// pdf is `1 / 4pi`
#[must_use]
pub fn square_to_uniform_sphere(rdf: Vec2d) -> Vec3d {
    #[allow(clippy::suboptimal_flops)]
    let z = 1.0 - 2.0 * rdf.x;
    #[allow(clippy::suboptimal_flops)]
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * consts::PI * rdf.y;
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3d::new(r * cos_phi, r * sin_phi, z)
}

/// An ordered set of unit directions distributed uniformly over the full sphere
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    directions: Vec<Vec3d>,
}

impl SampleSet {
    /// Draws `n` directions from `rd`. Every direction costs two random numbers.
    #[must_use]
    pub fn generate(n: usize, rd: &mut fastrand::Rng) -> Self {
        let directions = (0..n)
            .map(|_| square_to_uniform_sphere(Vec2d::new(rd.f64(), rd.f64())))
            .collect();
        Self { directions }
    }

    /// Like [`SampleSet::generate`] but seeded. `None` draws the seed from the thread local generator.
    #[must_use]
    pub fn generate_seeded(n: usize, seed: Option<u64>) -> Self {
        let mut rd = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self::generate(n, &mut rd)
    }

    /// Wraps already normalized directions, e.g. a low discrepancy sequence
    #[must_use]
    pub fn from_directions(directions: Vec<Vec3d>) -> Self {
        Self { directions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec3d> {
        self.directions.iter()
    }

    /// Factor that turns a sum of `cos * Y` over this set into the diffuse transfer estimate:
    /// `1 / (pi * N * pdf)`, which is `4 / N` for uniform sphere samples.
    #[must_use]
    pub fn transfer_normalization(&self) -> f64 {
        if self.directions.is_empty() {
            return 0.0;
        }
        1.0 / (consts::PI * self.directions.len() as f64 * UNIFORM_SPHERE_PDF)
    }
}

#[cfg(test)]
mod tests {
    use super::{square_to_uniform_sphere, SampleSet, UNIFORM_SPHERE_PDF};
    use crate::{
        test_utils::{assert_eq_approx_abs, assert_in_range},
        Vec2d, Vec3d,
    };

    #[test]
    fn unit_length() {
        let samples = SampleSet::generate_seeded(10_000, Some(1));
        assert_eq!(samples.len(), 10_000);
        for omega in samples.iter() {
            assert_eq_approx_abs!(omega.length(), 1.0, 1e-12);
        }
    }

    #[test]
    fn isotropic_mean() {
        let samples = SampleSet::generate_seeded(20_000, Some(7));
        let mean = samples.iter().copied().sum::<Vec3d>() / samples.len() as f64;
        // the standard error of each component is sqrt(1/3 / N) ~ 0.004
        assert_in_range!(mean.x, -0.03, 0.03);
        assert_in_range!(mean.y, -0.03, 0.03);
        assert_in_range!(mean.z, -0.03, 0.03);
    }

    #[test]
    fn covers_both_hemispheres() {
        let samples = SampleSet::generate_seeded(10_000, Some(5));
        let upper = samples.iter().filter(|omega| omega.z > 0.0).count();
        assert_in_range!(upper, 4_700, 5_300);
    }

    #[test]
    fn corners_of_the_square() {
        assert_eq_approx_abs!(square_to_uniform_sphere(Vec2d::new(0.0, 0.0)), Vec3d::Z, Vec3d::splat(1e-12));
        assert_eq_approx_abs!(square_to_uniform_sphere(Vec2d::new(1.0, 0.3)), -Vec3d::Z, Vec3d::splat(1e-12));
        assert_eq_approx_abs!(square_to_uniform_sphere(Vec2d::new(0.5, 0.25)), Vec3d::Y, Vec3d::splat(1e-12));
    }

    #[test]
    fn seeded_sets_are_reproducible() {
        assert_eq!(SampleSet::generate_seeded(64, Some(42)), SampleSet::generate_seeded(64, Some(42)));
    }

    #[test]
    fn normalization_matches_pdf() {
        let samples = SampleSet::generate_seeded(100, Some(0));
        assert_eq_approx_abs!(samples.transfer_normalization(), 0.04, 1e-15);
        assert_eq_approx_abs!(UNIFORM_SPHERE_PDF * 4.0 * std::f64::consts::PI, 1.0, 1e-15);
        assert_eq_approx_abs!(SampleSet::from_directions(Vec::new()).transfer_normalization(), 0.0, 0.0);
    }
}
