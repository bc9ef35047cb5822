//! Mesh containers: polygon meshes for solid models and line lists for
//! reference geometry
use crate::geometry::Aabb;
use crate::transform::Vec3;

mod face_mesh;
mod wire_mesh;

pub use face_mesh::{IndexedFace, IndexedMesh, PlanarFace};
pub use wire_mesh::WireMesh;

/// Vertex index into a position buffer
pub type Index = u32;

/// Box around all positions; a zero box at the origin when there are none
pub fn compute_extents(positions: &[Vec3]) -> Aabb {
    Aabb::from_points(positions).unwrap_or_else(|| Aabb::from_point(Vec3::zeros()))
}

/// Distance from `center` to the farthest position
pub fn compute_extents_from(positions: &[Vec3], center: &Vec3) -> f32 {
    positions
        .iter()
        .map(|p| (p - center).norm_squared())
        .fold(0.0f32, f32::max)
        .sqrt()
}
