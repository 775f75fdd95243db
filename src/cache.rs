//! Transfer cache with explicit validity state and the persistence seam
use std::fmt;

use log::debug;

use crate::{PrtError, Result, ShCoeffs};

/// Lifecycle of the transfer cache. Only [`CacheState::Ready`] allows relighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    /// nothing was computed or loaded yet
    Empty,
    /// a precomputation pass is running
    Computing,
    /// every mesh has a complete set of transfer vectors for the current geometry
    Ready,
    /// the last pass failed or the geometry or sampling changed since
    Invalid,
}

/// Vertex count per mesh, the shape a transfer cache must have
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CacheLayout {
    vertex_counts: Vec<usize>,
}

impl CacheLayout {
    #[must_use]
    pub fn new(vertex_counts: Vec<usize>) -> Self {
        Self { vertex_counts }
    }

    /// Layout of already computed transfer vectors
    #[must_use]
    pub fn of(meshes: &[Vec<ShCoeffs>]) -> Self {
        Self::new(meshes.iter().map(Vec::len).collect())
    }

    #[must_use]
    pub fn vertex_counts(&self) -> &[usize] {
        &self.vertex_counts
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.vertex_counts.len()
    }

    /// # Errors
    /// [`PrtError::CacheMismatch`] unless `found` equals `self`
    pub fn check(&self, found: &Self) -> Result<()> {
        if self == found {
            Ok(())
        } else {
            Err(PrtError::CacheMismatch {
                expected: self.clone(),
                found: found.clone(),
            })
        }
    }
}

impl fmt::Display for CacheLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} meshes with vertex counts {:?}", self.vertex_counts.len(), self.vertex_counts)
    }
}

/// Transfer vectors indexed by mesh, then by vertex
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCache {
    state: CacheState,
    meshes: Vec<Vec<ShCoeffs>>,
}

impl Default for TransferCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: CacheState::Empty,
            meshes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> CacheState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == CacheState::Ready
    }

    pub(crate) fn begin(&mut self) {
        self.meshes.clear();
        self.state = CacheState::Computing;
    }

    /// Installs a complete set of transfer vectors after checking it against `expected`.
    /// On any rejection the cache becomes [`CacheState::Invalid`].
    ///
    /// # Errors
    /// [`PrtError::CacheMismatch`] if `meshes` does not have the expected shape and
    /// [`PrtError::NonFiniteTransfer`] for the first vector with a NaN or infinite coefficient
    pub fn fill(&mut self, expected: &CacheLayout, meshes: Vec<Vec<ShCoeffs>>) -> Result<()> {
        let checked = expected
            .check(&CacheLayout::of(&meshes))
            .and_then(|()| check_finite(&meshes));
        if let Err(err) = checked {
            self.invalidate();
            return Err(err);
        }
        self.meshes = meshes;
        self.state = CacheState::Ready;
        Ok(())
    }

    /// Drops all transfer vectors, they no longer describe the geometry
    pub fn invalidate(&mut self) {
        if self.state != CacheState::Empty {
            debug!("transfer cache invalidated (was {:?})", self.state);
        }
        self.meshes.clear();
        self.state = CacheState::Invalid;
    }

    /// Transfer vectors of one mesh.
    ///
    /// # Errors
    /// [`PrtError::CacheNotReady`] outside [`CacheState::Ready`] and
    /// [`PrtError::MeshIndexOutOfRange`] for an unknown mesh
    pub fn mesh(&self, mesh: usize) -> Result<&[ShCoeffs]> {
        if !self.is_ready() {
            return Err(PrtError::CacheNotReady(self.state));
        }
        self.meshes
            .get(mesh)
            .map(Vec::as_slice)
            .ok_or(PrtError::MeshIndexOutOfRange(mesh))
    }

    /// All transfer vectors, only available when ready
    ///
    /// # Errors
    /// [`PrtError::CacheNotReady`] outside [`CacheState::Ready`]
    pub fn meshes(&self) -> Result<&[Vec<ShCoeffs>]> {
        if self.is_ready() {
            Ok(&self.meshes)
        } else {
            Err(PrtError::CacheNotReady(self.state))
        }
    }
}

fn check_finite(meshes: &[Vec<ShCoeffs>]) -> Result<()> {
    for (mesh, transfer) in meshes.iter().enumerate() {
        if let Some(vertex) = transfer.iter().position(|g| !g.is_finite()) {
            return Err(PrtError::NonFiniteTransfer { mesh, vertex });
        }
    }
    Ok(())
}

/// Persistence collaborator for transfer caches. The format is up to the implementation.
pub trait CacheStore {
    /// Loads transfer vectors that were computed for geometry of the given layout.
    /// Implementations may check the layout themselves, the caller always checks it again.
    ///
    /// # Errors
    /// Any failure to read or decode the stored data
    fn load(&self, expected: &CacheLayout) -> Result<Vec<Vec<ShCoeffs>>>;

    /// # Errors
    /// Any failure to encode or write the data
    fn save(&self, meshes: &[Vec<ShCoeffs>]) -> Result<()>;
}

/// Stores transfer caches as JSON: an array of meshes, each an array of 9 element arrays
#[cfg(feature = "json-cache")]
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    path: std::path::PathBuf,
}

#[cfg(feature = "json-cache")]
impl JsonCacheStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(feature = "json-cache")]
impl CacheStore for JsonCacheStore {
    fn load(&self, expected: &CacheLayout) -> Result<Vec<Vec<ShCoeffs>>> {
        let text = std::fs::read_to_string(&self.path)?;
        let meshes: Vec<Vec<ShCoeffs>> =
            serde_json::from_str(&text).map_err(|e| PrtError::Serialization(e.to_string()))?;
        expected.check(&CacheLayout::of(&meshes))?;
        log::info!("loaded transfer cache from {}", self.path.display());
        Ok(meshes)
    }

    fn save(&self, meshes: &[Vec<ShCoeffs>]) -> Result<()> {
        let text =
            serde_json::to_string(meshes).map_err(|e| PrtError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        log::info!("saved transfer cache to {}", self.path.display());
        Ok(())
    }
}

/// Keeps a saved cache in memory, useful when the host manages persistence itself
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    stored: std::sync::Mutex<Option<Vec<Vec<ShCoeffs>>>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `meshes`
    #[must_use]
    pub fn with_contents(meshes: Vec<Vec<ShCoeffs>>) -> Self {
        Self {
            stored: std::sync::Mutex::new(Some(meshes)),
        }
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, _expected: &CacheLayout) -> Result<Vec<Vec<ShCoeffs>>> {
        let stored = self
            .stored
            .lock()
            .map_err(|e| PrtError::Serialization(e.to_string()))?;
        stored.clone().ok_or_else(|| {
            PrtError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no transfer cache was saved",
            ))
        })
    }

    fn save(&self, meshes: &[Vec<ShCoeffs>]) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|e| PrtError::Serialization(e.to_string()))?;
        *stored = Some(meshes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheLayout, CacheState, CacheStore, MemoryCacheStore, TransferCache};
    use crate::{PrtError, ShCoeffs};

    fn coefficients(counts: &[usize]) -> Vec<Vec<ShCoeffs>> {
        counts.iter().map(|&n| vec![ShCoeffs::ZERO; n]).collect()
    }

    #[test]
    fn lifecycle() {
        let layout = CacheLayout::new(vec![3, 2]);
        let mut cache = TransferCache::new();
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(matches!(cache.mesh(0), Err(PrtError::CacheNotReady(CacheState::Empty))));

        cache.begin();
        assert_eq!(cache.state(), CacheState::Computing);
        cache.fill(&layout, coefficients(&[3, 2])).unwrap();
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.mesh(1).unwrap().len(), 2);
        assert!(matches!(cache.mesh(2), Err(PrtError::MeshIndexOutOfRange(2))));

        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Invalid);
        assert!(cache.meshes().is_err());
    }

    #[test]
    fn mismatched_fill_invalidates() {
        let mut cache = TransferCache::new();
        let err = cache
            .fill(&CacheLayout::new(vec![3, 2]), coefficients(&[3, 4]))
            .unwrap_err();
        assert!(matches!(err, PrtError::CacheMismatch { .. }));
        assert_eq!(cache.state(), CacheState::Invalid);

        let err = cache
            .fill(&CacheLayout::new(vec![3, 2]), coefficients(&[3]))
            .unwrap_err();
        assert!(matches!(err, PrtError::CacheMismatch { .. }));
    }

    #[test]
    fn non_finite_fill_invalidates() {
        let layout = CacheLayout::new(vec![2, 3]);
        let mut meshes = coefficients(&[2, 3]);
        meshes[1][2][4] = f64::NAN;
        let mut cache = TransferCache::new();
        let err = cache.fill(&layout, meshes).unwrap_err();
        assert!(matches!(err, PrtError::NonFiniteTransfer { mesh: 1, vertex: 2 }));
        assert_eq!(cache.state(), CacheState::Invalid);

        let mut meshes = coefficients(&[2, 3]);
        meshes[0][0][0] = f64::INFINITY;
        assert!(cache.fill(&layout, meshes).is_err());
        assert!(cache.fill(&layout, coefficients(&[2, 3])).is_ok());
    }

    #[test]
    fn memory_store_round_trip() {
        let layout = CacheLayout::new(vec![1]);
        let store = MemoryCacheStore::new();
        assert!(store.load(&layout).is_err());
        let mut g = ShCoeffs::ZERO;
        g[6] = 0.5;
        store.save(&[vec![g]]).unwrap();
        assert_eq!(store.load(&layout).unwrap(), vec![vec![g]]);
    }

    #[cfg(feature = "json-cache")]
    #[test]
    fn json_store_matches_layout() {
        use super::JsonCacheStore;

        let path = std::env::temp_dir().join(format!("prt-cache-{}.json", std::process::id()));
        let store = JsonCacheStore::new(&path);
        let mut g = ShCoeffs::ZERO;
        g[0] = 0.25;
        store.save(&[vec![g, g], vec![g]]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[[[0.25,0.0,"));

        let loaded = store.load(&CacheLayout::new(vec![2, 1])).unwrap();
        assert_eq!(loaded[1][0], g);
        assert!(matches!(
            store.load(&CacheLayout::new(vec![2, 2])),
            Err(PrtError::CacheMismatch { .. })
        ));
        std::fs::remove_file(path).unwrap();
    }
}
