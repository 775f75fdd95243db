//! The context object tying precomputation and relighting together
//!
//! A [`PrtEngine`] owns the scene, its spatial index, the transfer cache and the current light.
//! Changing geometry or sampling invalidates the cache. Relighting only ever reads the cache.
use std::time::Instant;

use log::{debug, info, warn};

use crate::{
    bvh::Bvh,
    cache::{CacheState, CacheStore, TransferCache},
    config::PrtConfig,
    light::{project_light, LightParams},
    sampler::SampleSet,
    scene::Scene,
    shading::shade_vertices,
    transfer::{compute_transfer, TransferHooks},
    PrtError, Result, RgbF, ShCoeffs,
};

#[derive(Debug)]
pub struct PrtEngine {
    config: PrtConfig,
    scene: Scene,
    index: Bvh,
    samples: Option<SampleSet>,
    cache: TransferCache,
    light_params: LightParams,
    light: ShCoeffs,
}

impl PrtEngine {
    /// Validates `config` and builds the spatial index of `scene`. The light starts out as
    /// [`LightParams::default`].
    ///
    /// # Errors
    /// [`PrtError::InvalidConfig`] for unusable settings and [`PrtError::EmptyGeometry`] if the
    /// scene has no triangles
    pub fn new(config: PrtConfig, scene: Scene) -> Result<Self> {
        config.validate()?;
        let index = scene.build_index(config.max_triangles_per_leaf)?;
        let light_params = LightParams::default();
        let light = project_light(&light_params)?;
        Ok(Self {
            config,
            scene,
            index,
            samples: None,
            cache: TransferCache::new(),
            light_params,
            light,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &PrtConfig {
        &self.config
    }

    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub const fn index(&self) -> &Bvh {
        &self.index
    }

    /// Sample set of the last precomputation pass
    #[must_use]
    pub const fn samples(&self) -> Option<&SampleSet> {
        self.samples.as_ref()
    }

    #[must_use]
    pub const fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Current light vector, without intensity
    #[must_use]
    pub const fn light(&self) -> &ShCoeffs {
        &self.light
    }

    #[must_use]
    pub const fn light_params(&self) -> &LightParams {
        &self.light_params
    }

    /// Replaces the geometry. The old scene and index stay in place if the new index cannot be
    /// built.
    ///
    /// # Errors
    /// [`PrtError::EmptyGeometry`] if `scene` has no triangles
    pub fn set_scene(&mut self, scene: Scene) -> Result<()> {
        let index = scene.build_index(self.config.max_triangles_per_leaf)?;
        self.scene = scene;
        self.index = index;
        self.samples = None;
        self.cache.invalidate();
        Ok(())
    }

    /// Changes the number of directions per vertex. The cache is invalidated if the count changed.
    ///
    /// # Errors
    /// [`PrtError::InvalidConfig`] for a zero count
    pub fn set_sample_count(&mut self, sample_count: usize) -> Result<()> {
        if sample_count == 0 {
            return Err(PrtError::InvalidConfig("sample_count must be positive".into()));
        }
        if sample_count != self.config.sample_count {
            self.config.sample_count = sample_count;
            self.cache.invalidate();
        }
        Ok(())
    }

    /// Runs a full precomputation pass over every mesh of the scene with one shared sample set.
    /// On success the cache is [`CacheState::Ready`], on any failure it is
    /// [`CacheState::Invalid`].
    ///
    /// # Errors
    /// [`PrtError::DegenerateNormal`] or [`PrtError::Cancelled`] from the integration
    pub fn precompute(&mut self, hooks: &TransferHooks) -> Result<()> {
        self.cache.begin();
        let start = Instant::now();
        let samples = SampleSet::generate_seeded(self.config.sample_count, self.config.seed);
        let offset = self.config.ray_offset.resolve(&self.index.bounds());
        info!(
            "precomputing transfer for {} meshes with {} samples per vertex",
            self.scene.len(),
            samples.len()
        );
        debug!("ray offset {offset}");

        let mut meshes = Vec::with_capacity(self.scene.len());
        for (i, object) in self.scene.objects().iter().enumerate() {
            match compute_transfer(i, &object.mesh, &self.index, &samples, offset, hooks) {
                Ok(transfer) => meshes.push(transfer),
                Err(err) => {
                    self.cache.invalidate();
                    return Err(err);
                }
            }
        }
        self.cache.fill(&self.scene.layout(), meshes)?;
        self.samples = Some(samples);
        info!("transfer precomputation finished in {:.2?}", start.elapsed());
        Ok(())
    }

    /// Projects a new light and makes it current. The previous light is kept on failure.
    ///
    /// # Errors
    /// [`PrtError::InvalidLight`] if the parameters have no finite projection
    pub fn update_light(&mut self, params: LightParams) -> Result<ShCoeffs> {
        self.light = project_light(&params)?;
        self.light_params = params;
        Ok(self.light)
    }

    /// Transfer vectors of one mesh
    ///
    /// # Errors
    /// [`PrtError::CacheNotReady`] or [`PrtError::MeshIndexOutOfRange`]
    pub fn transfer(&self, mesh: usize) -> Result<&[ShCoeffs]> {
        self.cache.mesh(mesh)
    }

    /// Vertex colors of one mesh under the current light
    ///
    /// # Errors
    /// [`PrtError::CacheNotReady`] unless the cache is ready and [`PrtError::MeshIndexOutOfRange`]
    /// for an unknown mesh
    pub fn shade_mesh(&self, mesh: usize) -> Result<Vec<RgbF>> {
        let transfer = self.cache.mesh(mesh)?;
        let object = self
            .scene
            .get(mesh)
            .ok_or(PrtError::MeshIndexOutOfRange(mesh))?;
        Ok(shade_vertices(
            &self.light,
            transfer,
            object.albedo,
            self.light_params.intensity,
        ))
    }

    /// Vertex colors of every mesh, in scene order
    ///
    /// # Errors
    /// [`PrtError::CacheNotReady`] unless the cache is ready
    pub fn shade_all(&self) -> Result<Vec<Vec<RgbF>>> {
        (0..self.scene.len()).map(|i| self.shade_mesh(i)).collect()
    }

    /// Replaces the cache with data from `store`. Returns whether the cache is ready afterwards.
    ///
    /// Data that does not match the scene's layout or holds non finite coefficients invalidates
    /// the cache. Any other load failure leaves the cache untouched.
    pub fn load_cache(&mut self, store: &impl CacheStore) -> bool {
        let layout = self.scene.layout();
        let loaded = store.load(&layout).and_then(|meshes| self.cache.fill(&layout, meshes));
        match loaded {
            Ok(()) => {
                info!("transfer cache loaded for {layout}");
                true
            }
            Err(err @ (PrtError::CacheMismatch { .. } | PrtError::NonFiniteTransfer { .. })) => {
                warn!("discarding transfer cache: {err}");
                self.cache.invalidate();
                false
            }
            Err(err) => {
                warn!("could not load transfer cache: {err}");
                false
            }
        }
    }

    /// Hands the ready cache to `store`. Returns whether it was saved.
    #[must_use]
    pub fn save_cache(&self, store: &impl CacheStore) -> bool {
        match self.cache.meshes().and_then(|meshes| store.save(meshes)) {
            Ok(()) => true,
            Err(err) => {
                warn!("could not save transfer cache: {err}");
                false
            }
        }
    }
}
