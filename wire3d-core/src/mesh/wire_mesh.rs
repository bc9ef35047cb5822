use std::f32::consts::TAU;

use super::{compute_extents, Index};
use crate::geometry::Aabb;
use crate::transform::Vec3;

/// Line-list mesh: positions plus pairs of indices, one pair per segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMesh {
    positions: Vec<Vec3>,
    indices: Vec<Index>,
}

impl WireMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// The twelve edges of a cube of edge 1 centered on the origin
    pub fn unit_cube() -> Self {
        let mut mesh = Self::new();
        for k in 0..8u32 {
            let s = |bit: u32| if k & bit != 0 { 0.5 } else { -0.5 };
            mesh.add_position(Vec3::new(s(1), s(2), s(4)));
        }
        const EDGES: [Index; 24] = [
            0, 2, 2, 3, 3, 1, 1, 0, // back
            4, 6, 6, 7, 7, 5, 5, 4, // front
            0, 4, 1, 5, 2, 6, 3, 7, // connecting
        ];
        mesh.indices.extend_from_slice(&EDGES);
        mesh
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.indices.clear();
    }

    pub fn compact_memory(&mut self) {
        self.positions.shrink_to_fit();
        self.indices.shrink_to_fit();
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn line_count(&self) -> usize {
        self.indices.len() / 2
    }

    /// Segments as pairs of positions
    pub fn lines(&self) -> impl Iterator<Item = (&Vec3, &Vec3)> + '_ {
        self.indices
            .chunks_exact(2)
            .map(|pair| (&self.positions[pair[0] as usize], &self.positions[pair[1] as usize]))
    }

    pub fn add_position(&mut self, position: Vec3) -> Index {
        self.positions.push(position);
        (self.positions.len() - 1) as Index
    }

    pub fn add_line(&mut self, i0: Index, i1: Index) {
        self.indices.push(i0);
        self.indices.push(i1);
    }

    /// Appends a ring (thick washer) around the z axis: `segments` boxy
    /// sections between `inner` and `outer` radius, `height` thick
    pub fn ring(&mut self, inner: f32, outer: f32, height: f32, segments: u32) {
        let half = height * 0.5;
        let base = self.positions.len() as Index;
        let step = TAU / segments as f32;

        for i in 0..segments {
            let (s, c) = (i as f32 * step).sin_cos();
            self.add_position(Vec3::new(outer * c, outer * s, -half));
            self.add_position(Vec3::new(outer * c, outer * s, half));
            self.add_position(Vec3::new(inner * c, inner * s, -half));
            self.add_position(Vec3::new(inner * c, inner * s, half));
        }

        let wrap = 4 * segments;
        for i in 0..segments {
            let m0 = 4 * i;
            let m1 = (m0 + 4) % wrap;
            // cross-section
            self.add_line(base + m0, base + m0 + 1);
            self.add_line(base + m0 + 1, base + m0 + 3);
            self.add_line(base + m0 + 3, base + m0 + 2);
            self.add_line(base + m0 + 2, base + m0);
            // to the next section
            for corner in 0..4 {
                self.add_line(base + m0 + corner, base + m1 + corner);
            }
        }
    }

    /// Appends a grid in the y = 0 plane spanning `[xa, xb] x [za, zb]`
    /// with `nx` and `nz` cells
    pub fn grid(&mut self, xa: f32, xb: f32, nx: u32, za: f32, zb: f32, nz: u32) {
        let dx = (xb - xa) / nx as f32;
        for ix in 0..=nx {
            let x = xa + ix as f32 * dx;
            let i0 = self.add_position(Vec3::new(x, 0.0, za));
            let i1 = self.add_position(Vec3::new(x, 0.0, zb));
            self.add_line(i0, i1);
        }

        let dz = (zb - za) / nz as f32;
        for iz in 0..=nz {
            let z = za + iz as f32 * dz;
            let i0 = self.add_position(Vec3::new(xa, 0.0, z));
            let i1 = self.add_position(Vec3::new(xb, 0.0, z));
            self.add_line(i0, i1);
        }
    }

    pub fn compute_extents(&self) -> Aabb {
        compute_extents(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_cube_edges() {
        let cube = WireMesh::unit_cube();
        assert_eq!(cube.position_count(), 8);
        assert_eq!(cube.line_count(), 12);
        for (a, b) in cube.lines() {
            assert_relative_eq!((a - b).norm(), 1.0);
        }
    }

    #[test]
    fn test_ring() {
        let mut ring = WireMesh::new();
        ring.ring(1.0, 2.0, 0.5, 8);
        assert_eq!(ring.position_count(), 32);
        assert_eq!(ring.line_count(), 64);

        let extents = ring.compute_extents();
        assert_relative_eq!(extents.max().z, 0.25);
        assert_relative_eq!(extents.max().x, 2.0);
        // last section connects back to the first
        assert!(ring.indices().chunks_exact(2).any(|p| p == [28, 0]));
    }

    #[test]
    fn test_grid() {
        let mut grid = WireMesh::new();
        grid.grid(-2.0, 2.0, 4, -1.0, 1.0, 2);
        assert_eq!(grid.line_count(), 5 + 3);
        assert_eq!(grid.position_count(), 16);
        assert!(grid.positions().iter().all(|p| p.y == 0.0));

        let extents = grid.compute_extents();
        assert_relative_eq!(*extents.min(), Vec3::new(-2.0, 0.0, -1.0));
        assert_relative_eq!(*extents.max(), Vec3::new(2.0, 0.0, 1.0));

        grid.clear();
        grid.compact_memory();
        assert_eq!(grid.line_count(), 0);
    }
}
