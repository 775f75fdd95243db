//! Per frame relighting from light and transfer coefficients
//!
//! Each coefficient product is clamped to `[0, 1]` on its own before the terms are summed,
//! which is what the viewer this crate replaces did. Standard SH relighting would clamp only
//! the final sum, so bright lights can saturate differently here.
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{utils::SafeCast, RgbD, RgbF, ShCoeffs};

/// Reflected radiance of one vertex, before albedo
#[must_use]
pub fn radiance(light: &ShCoeffs, transfer: &ShCoeffs, intensity: f64) -> f64 {
    light
        .iter()
        .zip(transfer.iter())
        .map(|(l, g)| (intensity * l * g).clamp(0.0, 1.0))
        .sum()
}

/// Color of one vertex: `sum_k clamp(intensity * L[k] * G[k], 0, 1) * albedo`
#[must_use]
pub fn shade(light: &ShCoeffs, transfer: &ShCoeffs, albedo: RgbF, intensity: f64) -> RgbD {
    albedo.safe_cast() * radiance(light, transfer, intensity)
}

/// Colors of all vertices of a mesh in vertex order
#[must_use]
pub fn shade_vertices(light: &ShCoeffs, transfer: &[ShCoeffs], albedo: RgbF, intensity: f64) -> Vec<RgbF> {
    let shade_one = |g: &ShCoeffs| shade(light, g, albedo, intensity).as_vec3();

    #[cfg(feature = "parallel")]
    let colors = transfer.par_iter().map(shade_one).collect();
    #[cfg(not(feature = "parallel"))]
    let colors = transfer.iter().map(shade_one).collect();

    colors
}
