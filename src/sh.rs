//! Real spherical harmonics basis for the bands `l = 0, 1, 2`
//!
//! The basis functions are evaluated as closed form polynomials in the components of a unit
//! direction. Coefficients are ordered by `(l, m)` with `m` running from `-l` to `l`, see
//! [`sh_index`](crate::sh_index). The sign convention includes the Condon-Shortley phase, i.e.
//! the odd order terms carry a negative sign.
use crate::{ShCoeffs, Vec3d};

/// `Y_0^0 = 1 / (2 sqrt(pi))`
pub const Y00: f64 = 0.282_094_791_773_878_1;
const Y1: f64 = 0.488_602_511_902_919_9;
const Y2_PLUS_MINUS_1: f64 = 1.092_548_430_592_079;
const Y2_0_A: f64 = 0.946_174_695_757_560_1;
const Y2_0_B: f64 = 0.315_391_565_252_520_1;
const Y2_PLUS_MINUS_2: f64 = 0.546_274_215_296_039_5;

/// Evaluates the 9 basis functions at the unit direction `omega`.
///
/// The result is only meaningful for normalized directions, the polynomials are not
/// renormalized.
#[must_use]
pub fn evaluate(omega: Vec3d) -> ShCoeffs {
    let Vec3d { x, y, z } = omega;
    let mut sh = ShCoeffs::ZERO;

    sh[0] = Y00;

    sh[1] = -Y1 * y;
    sh[2] = Y1 * z;
    sh[3] = -Y1 * x;

    #[allow(clippy::suboptimal_flops)]
    {
        sh[4] = Y2_PLUS_MINUS_2 * (2.0 * x * y);
        sh[5] = -Y2_PLUS_MINUS_1 * z * y;
        sh[6] = Y2_0_A * z * z - Y2_0_B;
        sh[7] = -Y2_PLUS_MINUS_1 * z * x;
        sh[8] = Y2_PLUS_MINUS_2 * (x * x - y * y);
    }

    sh
}
