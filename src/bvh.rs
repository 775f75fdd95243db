//! Bounding volume hierarchy over a static triangle soup
//!
//! The hierarchy is built once with median splits along the longest axis of the centroid
//! bounds and stored as a flat, depth first node array. The only query is an any-hit
//! occlusion test: traversal stops at the first triangle that intersects the ray segment.
use log::debug;

use crate::{PrtError, Result, Vec3d};

/// Determinant threshold below which a ray is treated as parallel to a triangle
const PARALLEL_EPSILON: f64 = 1e-12;

/// Median splits keep the tree depth below 33 for any `u32` triangle count
const TRAVERSAL_STACK_SIZE: usize = 64;

/// Default leaf size, matching the scene setup this crate was designed for
pub const DEFAULT_MAX_TRIANGLES_PER_LEAF: usize = 7;

/// Axis aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3d,
    pub max: Vec3d,
}

impl Aabb {
    /// Inverted box, the neutral element of [`Aabb::union`]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min: Vec3d::splat(f64::INFINITY),
            max: Vec3d::splat(f64::NEG_INFINITY),
        }
    }

    #[must_use]
    pub const fn new(min: Vec3d, max: Vec3d) -> Self {
        Self { min, max }
    }

    pub fn expand_point(&mut self, point: Vec3d) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    #[must_use]
    pub fn center(&self) -> Vec3d {
        (self.min + self.max) * 0.5
    }

    /// Length of the diagonal, `0.0` for an empty box
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            (self.max - self.min).length()
        }
    }

    /// Get longest axis (0=X, 1=Y, 2=Z)
    #[must_use]
    pub fn longest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Slab test against the segment `(t_min, t_max)` of `ray`.
    /// An axis the ray does not move along only checks that the origin lies inside the slab.
    #[must_use]
    pub fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> bool {
        let mut near = t_min;
        let mut far = t_max;
        for axis in 0..3 {
            let (origin, min, max) = (ray.origin[axis], self.min[axis], self.max[axis]);
            #[allow(clippy::float_cmp)]
            if ray.direction[axis] == 0.0 {
                if origin < min || origin > max {
                    return false;
                }
                continue;
            }
            let t0 = (min - origin) * ray.inv_direction[axis];
            let t1 = (max - origin) * ray.inv_direction[axis];
            near = near.max(t0.min(t1));
            far = far.min(t0.max(t1));
        }
        near <= far
    }
}

/// A triangle copied out of mesh geometry. Immutable once it is part of a [`Bvh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3d,
    pub v1: Vec3d,
    pub v2: Vec3d,
}

impl Triangle {
    #[must_use]
    pub const fn new(v0: Vec3d, v1: Vec3d, v2: Vec3d) -> Self {
        Self { v0, v1, v2 }
    }

    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb {
            min: self.v0.min(self.v1).min(self.v2),
            max: self.v0.max(self.v1).max(self.v2),
        }
    }

    #[must_use]
    pub fn centroid(&self) -> Vec3d {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Normalized face normal following counter clockwise winding, zero if degenerate
    #[must_use]
    pub fn geometric_normal(&self) -> Vec3d {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    /// Möller-Trumbore intersection, returns the ray parameter of a hit inside `(t_min, t_max)`
    #[must_use]
    pub fn intersect(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<f64> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > t_min && t < t_max).then_some(t)
    }
}

/// A ray with a cached reciprocal direction for slab tests
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3d,
    pub direction: Vec3d,
    inv_direction: Vec3d,
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3d, direction: Vec3d) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    /// `triangles[first..first + count]`
    Leaf { first: u32, count: u32 },
    /// the left child directly follows its parent
    Interior { right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    kind: NodeKind,
}

/// Static bounding volume hierarchy answering any-hit occlusion queries
#[derive(Debug, Clone)]
pub struct Bvh {
    triangles: Vec<Triangle>,
    nodes: Vec<Node>,
}

impl Bvh {
    /// Builds the hierarchy. Leaves hold at most `max_triangles_per_leaf` triangles (at least one).
    ///
    /// # Errors
    /// [`PrtError::EmptyGeometry`] if `triangles` is empty
    pub fn build(triangles: Vec<Triangle>, max_triangles_per_leaf: usize) -> Result<Self> {
        if triangles.is_empty() {
            return Err(PrtError::EmptyGeometry);
        }
        let max_triangles_per_leaf = max_triangles_per_leaf.max(1);

        let count = u32::try_from(triangles.len()).map_err(|_| {
            PrtError::MalformedMesh(format!("too many triangles: {}", triangles.len()))
        })?;

        let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
        let mut order: Vec<u32> = (0..count).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / max_triangles_per_leaf + 1);
        build_range(&mut nodes, &mut order, 0, &bounds, max_triangles_per_leaf);

        let triangles: Vec<Triangle> = order.iter().map(|&i| triangles[i as usize]).collect();
        debug!(
            "built bvh: {} triangles, {} nodes, max {} per leaf",
            triangles.len(),
            nodes.len(),
            max_triangles_per_leaf
        );
        Ok(Self { triangles, nodes })
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the whole scene
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    /// `true` if any triangle intersects the ray between `t_min` and `t_max` (both exclusive)
    #[must_use]
    pub fn occluded(&self, ray: &Ray, t_min: f64, t_max: f64) -> bool {
        let mut stack = [0_u32; TRAVERSAL_STACK_SIZE];
        let mut depth = 1;
        while depth > 0 {
            depth -= 1;
            let idx = stack[depth];
            let node = &self.nodes[idx as usize];
            if !node.bounds.hit(ray, t_min, t_max) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { first, count } => {
                    let leaf = &self.triangles[first as usize..(first + count) as usize];
                    if leaf.iter().any(|tri| tri.intersect(ray, t_min, t_max).is_some()) {
                        return true;
                    }
                }
                NodeKind::Interior { right } => {
                    stack[depth] = right;
                    stack[depth + 1] = idx + 1;
                    depth += 2;
                }
            }
        }
        false
    }

    /// Occlusion of the unbounded ray starting at `origin`
    #[must_use]
    pub fn occluded_from(&self, origin: Vec3d, direction: Vec3d) -> bool {
        self.occluded(&Ray::new(origin, direction), 0.0, f64::INFINITY)
    }
}

fn axis_value(v: Vec3d, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

/// Recursively partitions `order`, which starts at triangle offset `first`, and returns the index
/// of the node that was created for it
fn build_range(nodes: &mut Vec<Node>, order: &mut [u32], first: usize, bounds: &[Aabb], max_per_leaf: usize) -> u32 {
    let node_bounds = order
        .iter()
        .fold(Aabb::empty(), |acc, &i| acc.union(bounds[i as usize]));
    #[allow(clippy::cast_possible_truncation)]
    let idx = nodes.len() as u32;

    if order.len() <= max_per_leaf {
        #[allow(clippy::cast_possible_truncation)]
        nodes.push(Node {
            bounds: node_bounds,
            kind: NodeKind::Leaf {
                first: first as u32,
                count: order.len() as u32,
            },
        });
        return idx;
    }

    let mut centroids = Aabb::empty();
    for &i in &*order {
        centroids.expand_point(bounds[i as usize].center());
    }
    let axis = centroids.longest_axis();
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        let ca = axis_value(bounds[a as usize].center(), axis);
        let cb = axis_value(bounds[b as usize].center(), axis);
        ca.total_cmp(&cb)
    });

    // patched once the right subtree exists
    nodes.push(Node {
        bounds: node_bounds,
        kind: NodeKind::Interior { right: 0 },
    });
    let (left, right) = order.split_at_mut(mid);
    build_range(nodes, left, first, bounds, max_per_leaf);
    let right_idx = build_range(nodes, right, first + mid, bounds, max_per_leaf);
    nodes[idx as usize].kind = NodeKind::Interior { right: right_idx };
    idx
}
