use crate::transform::Vec3;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Zero-size box at `point`, ready to grow with [`Aabb::union_point`]
    pub fn from_point(point: Vec3) -> Self {
        Self::new(point, point)
    }

    /// Smallest box holding every point, or `None` for an empty slice
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut b = Self::from_point(*first);
        for p in rest {
            b.union_point(p);
        }
        Some(b)
    }

    pub fn min(&self) -> &Vec3 {
        &self.min
    }

    pub fn max(&self) -> &Vec3 {
        &self.max
    }

    pub fn union_box(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn union_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// True when this box lies entirely within `outer`
    pub fn is_inside(&self, outer: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] >= outer.min[i] && self.max[i] <= outer.max[i])
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn offset(&mut self, delta: &Vec3) {
        self.min += delta;
        self.max += delta;
    }

    /// Grows each side outward by the matching component of `amount`
    pub fn expand(&mut self, amount: &Vec3) {
        self.min -= amount;
        self.max += amount;
    }

    /// Shrinks the box to one of its eight octants
    pub fn deflate_to_octant(&mut self, high_x: bool, high_y: bool, high_z: bool) {
        let c = self.center();
        for (i, high) in [high_x, high_y, high_z].into_iter().enumerate() {
            if high {
                self.min[i] = c[i];
            } else {
                self.max[i] = c[i];
            }
        }
    }
}
