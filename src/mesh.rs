//! Triangle meshes as flat attribute buffers
//!
//! Positions and normals are stored the way a GPU vertex buffer stores them: three `f32` per
//! vertex in one contiguous array. All access goes through [`Mesh::vertex`] and friends so that
//! no caller does index arithmetic on the raw buffers.
use std::f32::consts;

use glam::{Mat3, Mat4, Vec3};

use crate::{
    bvh::Triangle,
    PrtError, Result, Vec3d,
};

/// A mesh vertex widened to `f64`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3d,
    pub normal: Vec3d,
}

/// Indexed triangle mesh with per vertex positions and normals
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    positions: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
}

fn read3(buffer: &[f32], i: usize) -> Vec3d {
    Vec3d::new(
        f64::from(buffer[i * 3]),
        f64::from(buffer[i * 3 + 1]),
        f64::from(buffer[i * 3 + 2]),
    )
}

fn write3(buffer: &mut [f32], i: usize, v: Vec3) {
    buffer[i * 3..i * 3 + 3].copy_from_slice(&v.to_array());
}

impl Mesh {
    /// Creates a mesh from flat buffers.
    ///
    /// # Errors
    /// [`PrtError::MalformedMesh`] if the buffer lengths are not multiples of three, positions and
    /// normals disagree on the vertex count or an index points past the last vertex.
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(PrtError::MalformedMesh(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        if normals.len() != positions.len() {
            return Err(PrtError::MalformedMesh(format!(
                "{} position components but {} normal components",
                positions.len(),
                normals.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(PrtError::MalformedMesh(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        let vertex_count = positions.len() / 3;
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(PrtError::MalformedMesh(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(Self {
            positions,
            normals,
            indices,
        })
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex(&self, i: usize) -> Option<Vertex> {
        if i >= self.vertex_count() {
            return None;
        }
        Some(Vertex {
            position: read3(&self.positions, i),
            normal: read3(&self.normals, i),
        })
    }

    pub fn vertices(&self) -> impl ExactSizeIterator<Item = Vertex> + '_ {
        (0..self.vertex_count()).map(|i| Vertex {
            position: read3(&self.positions, i),
            normal: read3(&self.normals, i),
        })
    }

    /// Copies every face out of the mesh for spatial index construction
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).map(|face| {
            Triangle::new(
                read3(&self.positions, face[0] as usize),
                read3(&self.positions, face[1] as usize),
                read3(&self.positions, face[2] as usize),
            )
        })
    }

    /// Applies an affine transform. Normals are transformed by the inverse transpose and
    /// renormalized, a normal that collapses stays zero.
    pub fn transform(&mut self, matrix: Mat4) {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        for i in 0..self.vertex_count() {
            let p = Vec3::from_slice(&self.positions[i * 3..]);
            write3(&mut self.positions, i, matrix.transform_point3(p));
            let n = Vec3::from_slice(&self.normals[i * 3..]);
            write3(&mut self.normals, i, (normal_matrix * n).normalize_or_zero());
        }
    }

    /// A square in the xy-plane centered at the origin facing `+z`, split into
    /// `segments x segments` quads
    #[must_use]
    pub fn plane(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let row = segments + 1;
        let step = size / segments as f32;
        let half = size * 0.5;

        let mut positions = Vec::with_capacity((row * row * 3) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());
        for iy in 0..row {
            for ix in 0..row {
                #[allow(clippy::suboptimal_flops)]
                positions.extend_from_slice(&[ix as f32 * step - half, half - iy as f32 * step, 0.0]);
                normals.extend_from_slice(&[0.0, 0.0, 1.0]);
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for iy in 0..segments {
            for ix in 0..segments {
                let a = iy * row + ix;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    /// A sphere around the origin with `rings` latitudinal bands and `segments` longitudinal ones.
    /// The poles are single vertices, faces are wound counter clockwise seen from outside.
    #[must_use]
    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);

        let mut normals = vec![0.0, 0.0, 1.0];
        for i in 1..rings {
            let theta = consts::PI * i as f32 / rings as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for j in 0..segments {
                let phi = 2.0 * consts::PI * j as f32 / segments as f32;
                let (sin_phi, cos_phi) = phi.sin_cos();
                normals.extend_from_slice(&[sin_theta * cos_phi, sin_theta * sin_phi, cos_theta]);
            }
        }
        normals.extend_from_slice(&[0.0, 0.0, -1.0]);
        let positions = normals.iter().map(|n| n * radius).collect();

        let ring_start = |i: u32| 1 + (i - 1) * segments;
        let bottom = 1 + (rings - 1) * segments;
        let mut indices = Vec::new();
        for j in 0..segments {
            let next = (j + 1) % segments;
            indices.extend_from_slice(&[0, ring_start(1) + j, ring_start(1) + next]);
        }
        for i in 1..rings - 1 {
            let (upper, lower) = (ring_start(i), ring_start(i + 1));
            for j in 0..segments {
                let next = (j + 1) % segments;
                indices.extend_from_slice(&[upper + j, lower + j, lower + next]);
                indices.extend_from_slice(&[upper + j, lower + next, upper + next]);
            }
        }
        let last = ring_start(rings - 1);
        for j in 0..segments {
            let next = (j + 1) % segments;
            indices.extend_from_slice(&[last + j, bottom, last + next]);
        }

        Self {
            positions,
            normals,
            indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::Mesh;
    use crate::{test_utils::assert_eq_approx_abs, PrtError, Vec3d};

    #[test]
    fn rejects_malformed_buffers() {
        assert!(matches!(
            Mesh::new(vec![0.0; 4], vec![0.0; 4], vec![]),
            Err(PrtError::MalformedMesh(_))
        ));
        assert!(matches!(
            Mesh::new(vec![0.0; 9], vec![0.0; 6], vec![0, 1, 2]),
            Err(PrtError::MalformedMesh(_))
        ));
        assert!(matches!(
            Mesh::new(vec![0.0; 9], vec![0.0; 9], vec![0, 1, 3]),
            Err(PrtError::MalformedMesh(_))
        ));
        assert!(Mesh::new(vec![0.0; 9], vec![0.0; 9], vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn vertex_accessor() {
        let mesh = Mesh::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            vec![],
        )
        .unwrap();
        let v = mesh.vertex(1).unwrap();
        assert_eq!(v.position, Vec3d::new(4.0, 5.0, 6.0));
        assert_eq!(v.normal, Vec3d::Y);
        assert!(mesh.vertex(2).is_none());
        assert_eq!(mesh.vertices().len(), 2);
    }

    #[test]
    fn plane_layout() {
        let plane = Mesh::plane(10.0, 4);
        assert_eq!(plane.vertex_count(), 25);
        assert_eq!(plane.triangle_count(), 32);
        assert_eq!(plane.vertex(0).unwrap().position, Vec3d::new(-5.0, 5.0, 0.0));
        assert_eq!(plane.vertex(24).unwrap().position, Vec3d::new(5.0, -5.0, 0.0));
        for tri in plane.triangles() {
            assert!(tri.geometric_normal().z > 0.0, "plane faces must point up");
        }
    }

    #[test]
    fn sphere_faces_point_outwards() {
        let sphere = Mesh::uv_sphere(2.0, 8, 16);
        assert_eq!(sphere.vertex_count(), 2 + 7 * 16);
        assert_eq!(sphere.triangle_count(), 2 * 16 + 2 * 6 * 16);
        for tri in sphere.triangles() {
            let outward = tri.geometric_normal().dot(tri.centroid());
            assert!(outward > 0.0);
        }
        for v in sphere.vertices() {
            assert_eq_approx_abs!(v.position.length(), 2.0, 1e-6);
            assert_eq_approx_abs!(v.normal.length(), 1.0, 1e-6);
        }
    }

    #[test]
    fn transform_moves_positions_and_rotates_normals() {
        let mut plane = Mesh::plane(2.0, 1);
        plane.transform(
            Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0))
                * Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2),
        );
        let v = plane.vertex(0).unwrap();
        assert_eq_approx_abs!(v.position.z, 4.0, 1e-6);
        assert_eq_approx_abs!(v.normal, -Vec3d::Y, Vec3d::splat(1e-6));
    }
}
