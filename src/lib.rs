#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::nursery)]
#![warn(clippy::suboptimal_flops)]
#![deny(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![deny(clippy::semicolon_if_nothing_returned)]
#![deny(clippy::must_use_candidate)]
#![deny(clippy::double_must_use)]
#![deny(clippy::use_self)]
#![deny(clippy::unreadable_literal)]
#![deny(clippy::explicit_iter_loop)]
// these are lints to enable later
#![allow(clippy::cast_lossless)]

//! This crate implements diffuse precomputed radiance transfer (PRT) for static triangle meshes.
//! Per vertex transfer vectors are integrated once with Monte Carlo ray casting, afterwards a
//! mesh can be relit under any analytic light source at the cost of a few multiplications per
//! vertex.
//!
//! # Design Decisions
//! **NOTE: This crate is pretty much in alpha state. Therefore a lot of the following things may
//! or may not change in the future**
//!
//! Only the first three spherical harmonics bands are used, that means 9 coefficients per vertex
//! ([`ShCoeffs`]). This is enough for low frequency lighting and soft shadows. Interreflections
//! and glossy transfer are **not implemented**.
//!
//! All integration is done in [f64]s, geometry and colors are stored as [f32]s for a minimal
//! memory footprint.
//!
//! Every vertex of a precomputation pass uses the same set of random directions. This keeps the
//! noise coherent across a surface and makes passes with a fixed seed reproducible.
//!
//! Visibility is an any-hit query against a bounding volume hierarchy over every triangle of the
//! scene. Meshes shadow each other as well as themselves.
//!
//! The [`engine::PrtEngine`] ties everything together. The transfer cache it owns has an explicit
//! [`cache::CacheState`]. Relighting never touches a cache that does not match the geometry.
//!
//! With the `parallel` feature (default) vertices are integrated and shaded on the rayon worker
//! pool. The `serde` feature derives serialization for coefficients, settings and lights, while
//! `json-cache` adds a file backed [`cache::CacheStore`].
//!
//! This crate is built on [glam] for a simple but fast vector math library at the core.
//!
//! # References
//! * Peter-Pike Sloan, Jan Kautz, and John Snyder. Precomputed radiance transfer for real-time
//!     rendering in dynamic, low-frequency lighting environments. *ACM Transactions on Graphics,
//!     21(3):527–536,* 2002.
//! * Robin Green. Spherical harmonic lighting: the gritty details. *Game Developers Conference,* 2003.
//! * Peter-Pike Sloan. Stupid spherical harmonics (SH) tricks. *Game Developers Conference,* 2008.
//! * Tomas Möller and Ben Trumbore. Fast, minimum storage ray-triangle intersection.
//!     *Journal of Graphics Tools, 2(1):21–28,* 1997.

mod core;
mod error;

pub use crate::core::{sh_index, RgbD, RgbF, ShCoeffs, Vec2d, Vec3d, MAX_BAND, N_COEFFS};
pub use config::{PrtConfig, RayOffset};
pub use engine::PrtEngine;
pub use error::{PrtError, Result};

#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod utils;

pub mod bvh;
pub mod cache;
pub mod config;
pub mod engine;
pub mod light;
pub mod mesh;
pub mod sampler;
pub mod scene;
pub mod sh;
pub mod shading;
pub mod transfer;
