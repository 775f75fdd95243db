//! The static set of meshes transfer is computed for
use crate::{
    bvh::Bvh,
    cache::CacheLayout,
    mesh::Mesh,
    Result, RgbF,
};

/// A mesh together with its constant diffuse reflectance
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub mesh: Mesh,
    /// The color. Every component should be in \[0,1\] to preserve physical validity.
    pub albedo: RgbF,
}

impl SceneObject {
    #[must_use]
    pub const fn new(mesh: Mesh, albedo: RgbF) -> Self {
        Self { mesh, albedo }
    }
}

/// Ordered list of meshes. Every mesh both receives transfer and occludes the others.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    #[must_use]
    pub fn new(objects: Vec<SceneObject>) -> Self {
        Self { objects }
    }

    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn get(&self, mesh: usize) -> Option<&SceneObject> {
        self.objects.get(mesh)
    }

    /// Vertex count of every mesh, used to validate cached transfer vectors
    #[must_use]
    pub fn layout(&self) -> CacheLayout {
        CacheLayout::new(self.objects.iter().map(|o| o.mesh.vertex_count()).collect())
    }

    /// Builds one spatial index over the triangles of all meshes.
    ///
    /// # Errors
    /// [`PrtError::EmptyGeometry`](crate::PrtError::EmptyGeometry) if no mesh has a triangle
    pub fn build_index(&self, max_triangles_per_leaf: usize) -> Result<Bvh> {
        let triangles = self
            .objects
            .iter()
            .flat_map(|o| o.mesh.triangles())
            .collect();
        Bvh::build(triangles, max_triangles_per_leaf)
    }
}
