//! Projection of analytic light sources onto the spherical harmonics basis
//!
//! Every supported source is axially symmetric, so its projection around the local "up" axis
//! (`+z`) only has zonal (`m = 0`) coefficients. Arbitrary directions are handled by rotating the
//! zonal coefficients with
//! `L[l(l+1)+m] = sqrt(4pi / (2l+1)) * z[l(l+1)] * Y[l(l+1)+m](direction)`.
use std::f64::consts;

use crate::{sh, sh_index, utils::FloatExt, PrtError, Result, ShCoeffs, Vec3d, MAX_BAND};

/// Shape of an axially symmetric light source
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightShape {
    /// A uniformly emitting disk of `radius` facing the surface from `distance`
    Disk { radius: f64, distance: f64 },
    /// Constant radiance from every direction
    Uniform { radiance: f64 },
}

/// Everything the light vector depends on
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightParams {
    pub shape: LightShape,
    /// Direction towards the light, does not need to be normalized
    pub direction: Vec3d,
    /// Scales the reflected radiance when shading. It is not part of the light vector.
    pub intensity: f64,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            shape: LightShape::Disk {
                radius: 1.0,
                distance: 3.5,
            },
            direction: Vec3d::Z,
            intensity: 1.0,
        }
    }
}

impl LightShape {
    /// Coefficients of the source centered around `+z`. Only zonal terms are nonzero.
    ///
    /// # Errors
    /// [`PrtError::InvalidLight`] if the shape has no finite projection
    pub fn zonal(self) -> Result<ShCoeffs> {
        let mut z = ShCoeffs::ZERO;
        match self {
            Self::Disk { radius, distance } => {
                if !(radius > 0.0 && distance > 0.0 && radius.is_finite() && distance.is_finite()) {
                    return Err(PrtError::InvalidLight(format!(
                        "disk radius {radius} and distance {distance} must be positive and finite"
                    )));
                }
                if radius > distance {
                    return Err(PrtError::InvalidLight(format!(
                        "disk radius {radius} exceeds its distance {distance}"
                    )));
                }
                let ratio = radius.sq() / distance.sq();
                let cos_alpha = (1.0 - ratio).sqrt();
                z[sh_index(0, 0)] = consts::PI.sqrt() * (1.0 - cos_alpha);
                z[sh_index(1, 0)] = (3.0 * consts::PI).sqrt() * ratio / 2.0;
                z[sh_index(2, 0)] = (5.0 * consts::PI).sqrt() * ratio * cos_alpha / 2.0;
            }
            Self::Uniform { radiance } => {
                if !radiance.is_finite() {
                    return Err(PrtError::InvalidLight(format!(
                        "radiance {radiance} is not finite"
                    )));
                }
                z[sh_index(0, 0)] = 2.0 * consts::PI.sqrt() * radiance;
            }
        }
        Ok(z)
    }
}

/// Rotates zonal coefficients (symmetric around `+z`) so that their axis points along the
/// unit vector `direction`
#[must_use]
pub fn rotate_zonal(zonal: &ShCoeffs, direction: Vec3d) -> ShCoeffs {
    let y = sh::evaluate(direction);
    let mut rotated = ShCoeffs::ZERO;
    for l in 0..=MAX_BAND {
        let band_scale = (4.0 * consts::PI / (2 * l + 1) as f64).sqrt() * zonal[sh_index(l, 0)];
        #[allow(clippy::cast_possible_wrap)]
        let l_signed = l as isize;
        for m in -l_signed..=l_signed {
            let k = sh_index(l, m);
            rotated[k] = band_scale * y[k];
        }
    }
    rotated
}

/// Computes the light vector. Intensity is applied when shading, not here.
///
/// # Errors
/// [`PrtError::InvalidLight`] for a zero or non finite direction or an invalid shape
pub fn project_light(params: &LightParams) -> Result<ShCoeffs> {
    let direction = params.direction.try_normalize().ok_or_else(|| {
        PrtError::InvalidLight(format!("direction {:?} cannot be normalized", params.direction))
    })?;
    if !params.intensity.is_finite() {
        return Err(PrtError::InvalidLight(format!(
            "intensity {} is not finite",
            params.intensity
        )));
    }
    let zonal = params.shape.zonal()?;
    Ok(rotate_zonal(&zonal, direction))
}
