//! Monte Carlo integration of per vertex diffuse transfer
//!
//! For a vertex with position `p` and normal `n` the transfer vector is
//! `G_k = 1 / pi * int_H V(w) max(0, w.n) Y_k(w) dw`, estimated with a shared [`SampleSet`] as
//! `G_k = 1 / (pi * N * pdf) * sum_i V(w_i) max(0, w_i.n) Y_k(w_i)`.
//! Visibility `V` is an any-hit query against the scene's [`Bvh`] from `p` pushed along `n`.
//!
//! Vertices are independent given the read only index and sample set. With the `parallel`
//! feature every vertex is integrated on the rayon worker pool and writes only its own slot.
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    bvh::{Bvh, Ray},
    mesh::{Mesh, Vertex},
    sampler::SampleSet,
    sh, PrtError, Result, ShCoeffs,
};

/// A shareable flag that asks a running precomputation to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress report of a precomputation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// index of the mesh that is being integrated
    pub mesh: usize,
    /// vertices of this mesh that are done
    pub completed: usize,
    /// vertices of this mesh
    pub total: usize,
}

type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Optional observers of a precomputation pass
pub struct TransferHooks {
    pub cancel: CancelToken,
    on_progress: Option<ProgressCallback>,
    /// a progress report is emitted every `report_every` vertices
    pub report_every: usize,
}

impl std::fmt::Debug for TransferHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferHooks")
            .field("cancel", &self.cancel)
            .field("on_progress", &self.on_progress.is_some())
            .field("report_every", &self.report_every)
            .finish()
    }
}

impl Default for TransferHooks {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            on_progress: None,
            report_every: 256,
        }
    }
}

impl TransferHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    fn report(&self, progress: Progress) {
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}

/// Integrates the transfer vector of a single vertex.
///
/// `offset` is the distance the ray origin is pushed along the normal. Samples below the
/// surface are skipped before the visibility query. A vertex that sees nothing gets an all
/// zero vector. Returns `None` if the normal cannot be normalized.
#[must_use]
pub fn vertex_transfer(vertex: &Vertex, index: &Bvh, samples: &SampleSet, offset: f64) -> Option<ShCoeffs> {
    let n = vertex.normal.try_normalize()?;
    let origin = vertex.position + n * offset;

    let mut g = ShCoeffs::ZERO;
    for &omega in samples.iter() {
        let cos_theta = omega.dot(n).max(0.0);
        if cos_theta <= 0.0 {
            continue;
        }
        if index.occluded(&Ray::new(origin, omega), 0.0, f64::INFINITY) {
            continue;
        }
        g.add_scaled(&sh::evaluate(omega), cos_theta);
    }
    Some(g.scaled(samples.transfer_normalization()))
}

/// Computes one transfer vector per vertex of `mesh`, in vertex order.
///
/// All normals are checked before any ray is traced, so a mesh with a degenerate normal fails
/// fast and produces no partial result.
///
/// # Errors
/// [`PrtError::DegenerateNormal`] for the first vertex whose normal cannot be normalized and
/// [`PrtError::Cancelled`] if the hooks' cancel token was triggered
pub fn compute_transfer(
    mesh_index: usize,
    mesh: &Mesh,
    index: &Bvh,
    samples: &SampleSet,
    offset: f64,
    hooks: &TransferHooks,
) -> Result<Vec<ShCoeffs>> {
    if let Some(vertex) = mesh
        .vertices()
        .position(|v| v.normal.try_normalize().is_none())
    {
        return Err(PrtError::DegenerateNormal {
            mesh: mesh_index,
            vertex,
        });
    }

    let total = mesh.vertex_count();
    let completed = AtomicUsize::new(0);
    let report_every = hooks.report_every.max(1);
    let integrate = |(i, vertex): (usize, Vertex)| -> Result<ShCoeffs> {
        if hooks.cancel.is_cancelled() {
            return Err(PrtError::Cancelled);
        }
        let g = vertex_transfer(&vertex, index, samples, offset).ok_or(PrtError::DegenerateNormal {
            mesh: mesh_index,
            vertex: i,
        })?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % report_every == 0 || done == total {
            hooks.report(Progress {
                mesh: mesh_index,
                completed: done,
                total,
            });
        }
        Ok(g)
    };

    #[cfg(feature = "parallel")]
    let result = (0..total)
        .into_par_iter()
        .filter_map(|i| mesh.vertex(i).map(|v| (i, v)))
        .map(integrate)
        .collect();
    #[cfg(not(feature = "parallel"))]
    let result = mesh.vertices().enumerate().map(integrate).collect();

    result
}
