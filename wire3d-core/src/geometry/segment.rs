use crate::transform::Vec3;

/// Which normal a collision between two overlapping edges should use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionNormal {
    /// `edge_i1 x edge_j0`: the other segment covers our start
    EdgeI1CrossJ0,
    /// Negated normal of the other segment: neither end was clipped
    NegatedOther,
    /// `edge_j1 x edge_i0`: the other segment covers our end
    EdgeJ1CrossI0,
    /// Our own normal: both ends were clipped
    Own,
}

/// Outcome details of [`Segment::merge_colinear_intersection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStatus {
    pub normal: CollisionNormal,
    /// The other segment runs opposite to this one
    pub reversed: bool,
}

impl LineStatus {
    const REVERSED_BIT: u32 = 0x8000_0000;

    fn from_bits(bits: u32) -> Self {
        let normal = match bits & 0x03 {
            0x00 => CollisionNormal::EdgeI1CrossJ0,
            0x01 => CollisionNormal::NegatedOther,
            0x02 => CollisionNormal::EdgeJ1CrossI0,
            _ => CollisionNormal::Own,
        };
        Self {
            normal,
            reversed: bits & Self::REVERSED_BIT != 0,
        }
    }

    /// Packed form: low two bits select the normal, the high bit marks reversal
    pub fn to_bits(&self) -> u32 {
        let low = match self.normal {
            CollisionNormal::EdgeI1CrossJ0 => 0x00,
            CollisionNormal::NegatedOther => 0x01,
            CollisionNormal::EdgeJ1CrossI0 => 0x02,
            CollisionNormal::Own => 0x03,
        };
        if self.reversed {
            low | Self::REVERSED_BIT
        } else {
            low
        }
    }
}

/// Line segment between two endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    v: [Vec3; 2],
}

impl Segment {
    pub fn new(v0: Vec3, v1: Vec3) -> Self {
        Self { v: [v0, v1] }
    }

    pub fn v0(&self) -> &Vec3 {
        &self.v[0]
    }

    pub fn v1(&self) -> &Vec3 {
        &self.v[1]
    }

    pub fn set_v0(&mut self, v: Vec3) {
        self.v[0] = v;
    }

    pub fn set_v1(&mut self, v: Vec3) {
        self.v[1] = v;
    }

    /// Endpoint 0 or 1
    ///
    /// # Panics
    /// When `index > 1`.
    pub fn get(&self, index: usize) -> &Vec3 {
        &self.v[index]
    }

    pub fn reverse(&mut self) {
        self.v.swap(0, 1);
    }

    /// Parameters of `other`'s endpoints along this segment (0 at v0,
    /// 1 at v1), sorted, and whether they had to be swapped.
    fn project_onto(&self, other: &Segment) -> (f32, f32, bool) {
        let basis = self.v[1] - self.v[0];
        let recip_mag_sq = 1.0 / basis.norm_squared();
        let tj0 = basis.dot(&(other.v[0] - self.v[0])) * recip_mag_sq;
        let tj1 = basis.dot(&(other.v[1] - self.v[0])) * recip_mag_sq;
        if tj0 > tj1 {
            (tj1, tj0, true)
        } else {
            (tj0, tj1, false)
        }
    }

    /// True if `other` overlaps this segment, assuming both are colinear
    pub fn test_colinear_intersection(&self, other: &Segment) -> bool {
        let (tj0, tj1, _) = self.project_onto(other);
        tj0.max(0.0) <= tj1.min(1.0)
    }

    /// Clips this segment to its overlap with the colinear `other`.
    ///
    /// Returns whether the segments overlap, plus which collision normal
    /// applies given which of our ends were replaced.
    pub fn merge_colinear_intersection(&mut self, other: &Segment) -> (bool, LineStatus) {
        let mut status = 0x01u32;
        let (tj0, tj1, swapped) = self.project_onto(other);
        let j = if swapped {
            status |= LineStatus::REVERSED_BIT;
            1
        } else {
            0
        };

        let mut ta = 0.0f32;
        let mut tb = 1.0f32;

        if tj0 > ta {
            ta = tj0;
            self.v[0] = other.v[j];
            status ^= 0x01;
        }

        if tj1 < tb {
            tb = tj1;
            self.v[1] = other.v[1 - j];
            status ^= 0x03;
        }

        (ta <= tb, LineStatus::from_bits(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(a: f32, b: f32) -> Segment {
        Segment::new(Vec3::new(a, 0.0, 0.0), Vec3::new(b, 0.0, 0.0))
    }

    #[test]
    fn test_colinear_intersection() {
        assert!(seg(0.0, 2.0).test_colinear_intersection(&seg(1.0, 3.0)));
        assert!(seg(0.0, 2.0).test_colinear_intersection(&seg(3.0, 1.0)));
        assert!(seg(0.0, 2.0).test_colinear_intersection(&seg(2.0, 3.0)));
        assert!(!seg(0.0, 2.0).test_colinear_intersection(&seg(2.5, 3.0)));
    }

    #[test]
    fn test_merge_clips_to_overlap() {
        let mut s = seg(0.0, 4.0);
        let (hit, status) = s.merge_colinear_intersection(&seg(1.0, 6.0));
        assert!(hit);
        assert_relative_eq!(*s.v0(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*s.v1(), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(status.normal, CollisionNormal::EdgeI1CrossJ0);
        assert!(!status.reversed);
    }

    #[test]
    fn test_merge_reversed_inside() {
        let mut s = seg(0.0, 4.0);
        let (hit, status) = s.merge_colinear_intersection(&seg(3.0, 1.0));
        assert!(hit);
        assert_relative_eq!(*s.v0(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(*s.v1(), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(status.normal, CollisionNormal::Own);
        assert!(status.reversed);
        assert_eq!(status.to_bits(), 0x8000_0003);
    }

    #[test]
    fn test_merge_untouched_and_disjoint() {
        let mut s = seg(1.0, 2.0);
        let (hit, status) = s.merge_colinear_intersection(&seg(0.0, 3.0));
        assert!(hit);
        assert_eq!(status.normal, CollisionNormal::NegatedOther);
        assert_eq!(s, seg(1.0, 2.0));

        let mut s = seg(0.0, 1.0);
        let (hit, _) = s.merge_colinear_intersection(&seg(2.0, 3.0));
        assert!(!hit);
    }

    #[test]
    fn test_reverse() {
        let mut s = seg(0.0, 1.0);
        s.reverse();
        assert_eq!(s, seg(1.0, 0.0));
    }
}
