use log::warn;

use super::{compute_extents, compute_extents_from, Index};
use crate::geometry::Aabb;
use crate::transform::Vec3;

/// Cosine above which two unit normals are treated as the same (about 1.1°)
const NORMAL_MATCH_COS: f32 = 0.9998;

/// Squared length below which a face normal is considered degenerate
const DEGENERATE_NORMAL_SQ: f32 = 1.0e-5;

/// Face record: a range of the shared index buffer plus its normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexedFace {
    /// Index into the normal buffer; `None` until normals are indexed
    pub normal: Option<Index>,
    /// Offset of the first vertex index in the shared index buffer
    pub first: Index,
    pub count: Index,
    /// The normal could not be computed and was replaced by +y
    pub degenerate: bool,
}

/// A polygon given by its own list of position indices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanarFace {
    pub normal: Option<Index>,
    pub positions: Vec<Index>,
}

impl PlanarFace {
    pub fn new(positions: Vec<Index>) -> Self {
        Self { normal: None, positions }
    }
}

/// Polygon mesh with one shared index buffer and deduplicated face normals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<Index>,
    faces: Vec<IndexedFace>,
}

impl IndexedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Axis-aligned cube of edge `size` centered at the origin, as six
    /// quads wound counter-clockwise when seen from outside
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::new();

        // bit 0 selects +x, bit 1 +y, bit 2 +z
        for k in 0..8u32 {
            let s = |bit: u32| if k & bit != 0 { half } else { -half };
            mesh.add_position(Vec3::new(s(1), s(2), s(4)));
        }

        let quads: [[Index; 4]; 6] = [
            [4, 5, 7, 6], // front
            [0, 2, 3, 1], // back
            [2, 6, 7, 3], // top
            [0, 1, 5, 4], // bottom
            [1, 3, 7, 5], // right
            [0, 4, 6, 2], // left
        ];
        for quad in quads {
            mesh.add_planar_face(&PlanarFace::new(quad.to_vec()));
        }

        mesh.index_face_normals();
        mesh
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
        self.faces.clear();
    }

    /// Releases excess capacity of every buffer
    pub fn compact_memory(&mut self) {
        self.positions.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.faces.shrink_to_fit();
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn normal_count(&self) -> usize {
        self.normals.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    pub fn faces(&self) -> &[IndexedFace] {
        &self.faces
    }

    pub fn position(&self, index: Index) -> &Vec3 {
        &self.positions[index as usize]
    }

    pub fn normal(&self, index: Index) -> &Vec3 {
        &self.normals[index as usize]
    }

    pub fn face(&self, index: usize) -> &IndexedFace {
        &self.faces[index]
    }

    pub fn add_position(&mut self, position: Vec3) -> Index {
        self.positions.push(position);
        (self.positions.len() - 1) as Index
    }

    pub fn add_normal(&mut self, normal: Vec3) -> Index {
        self.normals.push(normal);
        (self.normals.len() - 1) as Index
    }

    /// Appends one entry to the shared index buffer
    pub fn add_index(&mut self, index: Index) {
        self.indices.push(index);
    }

    /// Drops shared index entries past `len`, undoing a partial face
    pub fn truncate_indices(&mut self, len: usize) {
        self.indices.truncate(len);
    }

    /// Records a face over indices already in the shared buffer.
    ///
    /// # Panics
    /// If the face's range runs past the end of the index buffer.
    pub fn add_face(&mut self, face: IndexedFace) -> usize {
        let end = face.first as usize + face.count as usize;
        assert!(
            end <= self.indices.len(),
            "face range {}..{} outside index buffer of {}",
            face.first,
            end,
            self.indices.len()
        );
        self.faces.push(face);
        self.faces.len() - 1
    }

    /// Copies the face's indices into the shared buffer and records it
    pub fn add_planar_face(&mut self, face: &PlanarFace) -> usize {
        let first = self.indices.len() as Index;
        self.indices.extend_from_slice(&face.positions);
        self.add_face(IndexedFace {
            normal: face.normal,
            first,
            count: face.positions.len() as Index,
            degenerate: false,
        })
    }

    /// The slice of the shared index buffer a face refers to
    pub fn face_indices(&self, face: &IndexedFace) -> &[Index] {
        let start = face.first as usize;
        &self.indices[start..start + face.count as usize]
    }

    /// Newell-style normal of a face: cross products of a fan around the
    /// first vertex, summed. Returns `(normal, degenerate)`; a degenerate
    /// face gets +y.
    pub fn face_normal(&self, face: &IndexedFace) -> (Vec3, bool) {
        let idx = self.face_indices(face);
        let mut sum = Vec3::zeros();
        if let Some((&pivot, rest)) = idx.split_first() {
            let p0 = self.positions[pivot as usize];
            for pair in rest.windows(2) {
                let a = self.positions[pair[0] as usize] - p0;
                let b = self.positions[pair[1] as usize] - p0;
                sum += a.cross(&b);
            }
        }

        let len_sq = sum.norm_squared();
        if len_sq > DEGENERATE_NORMAL_SQ {
            (sum / len_sq.sqrt(), false)
        } else {
            (Vec3::y(), true)
        }
    }

    /// First stored normal within the match threshold of `normal`
    pub fn find_matching_normal(&self, normal: &Vec3) -> Option<Index> {
        self.normals
            .iter()
            .position(|n| n.dot(normal) > NORMAL_MATCH_COS)
            .map(|i| i as Index)
    }

    /// Computes every face normal, sharing entries between faces whose
    /// normals match
    pub fn index_face_normals(&mut self) {
        for i in 0..self.faces.len() {
            let face = self.faces[i];
            let (normal, degenerate) = self.face_normal(&face);
            if degenerate {
                warn!("face {} is degenerate; using default normal", i);
            }
            let index = match self.find_matching_normal(&normal) {
                Some(index) => index,
                None => self.add_normal(normal),
            };
            let face = &mut self.faces[i];
            face.normal = Some(index);
            face.degenerate = degenerate;
        }
    }

    pub fn compute_extents(&self) -> Aabb {
        compute_extents(&self.positions)
    }

    /// Distance from `center` to the farthest position
    pub fn compute_extents_from(&self, center: &Vec3) -> f32 {
        compute_extents_from(&self.positions, center)
    }

    /// Moves `center` to the origin and scales every position by `scale`
    pub fn recenter_and_scale(&mut self, center: &Vec3, scale: f32) {
        for p in &mut self.positions {
            *p = (*p - center) * scale;
        }
    }
}
