use crate::cache::{CacheLayout, CacheState};

/// Errors produced while building the spatial index, integrating transfer or relighting
#[derive(thiserror::Error, Debug)]
pub enum PrtError {
    /// The scene contains no triangles to build a spatial index from
    #[error("cannot build a spatial index from zero triangles")]
    EmptyGeometry,

    /// A vertex normal has zero length or is not finite
    #[error("vertex {vertex} of mesh {mesh} has a degenerate normal")]
    DegenerateNormal {
        /// index of the mesh in the scene
        mesh: usize,
        /// index of the vertex in the mesh
        vertex: usize,
    },

    /// A loaded transfer cache does not fit the current geometry
    #[error("transfer cache layout mismatch: expected {expected}, found {found}")]
    CacheMismatch {
        /// layout of the current scene
        expected: CacheLayout,
        /// layout of the loaded data
        found: CacheLayout,
    },

    /// A transfer vector contains NaN or infinite coefficients
    #[error("transfer vector of vertex {vertex} in mesh {mesh} is not finite")]
    NonFiniteTransfer {
        /// index of the mesh in the scene
        mesh: usize,
        /// index of the vertex in the mesh
        vertex: usize,
    },

    /// Attribute buffers or triangle indices are inconsistent
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),

    /// Precomputation settings that cannot produce a transfer cache
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Light parameters that have no finite projection
    #[error("invalid light parameters: {0}")]
    InvalidLight(String),

    /// The runtime evaluator was used without a ready transfer cache
    #[error("transfer cache is not ready (state: {0:?})")]
    CacheNotReady(CacheState),

    /// There is no mesh with this index in the scene
    #[error("mesh index {0} is out of range")]
    MeshIndexOutOfRange(usize),

    /// The precomputation was cancelled through its hooks
    #[error("transfer precomputation was cancelled")]
    Cancelled,

    /// IO error of a cache store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding error of a cache store
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, PrtError>;
