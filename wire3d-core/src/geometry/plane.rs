use log::warn;

use super::Sphere;
use crate::transform::{Mat4, Quat, Transform, Vec3, Vec4};

/// Squared length below which a three-point normal is reported as degenerate
const DEGENERATE_NORMAL_SQ: f32 = 1.0e-12;

/// Oriented plane stored as `(normal.xyz, distance)`.
///
/// A point `p` lies on the plane when `normal . p == distance`. Positive
/// signed distances are on the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    v: Vec4,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            v: Vec4::new(normal.x, normal.y, normal.z, distance),
        }
    }

    /// Plane through `point` with the given normal (normalized here)
    pub fn from_normal_point(normal: &Vec3, point: &Vec3) -> Self {
        let n = normal.normalize();
        Self::new(n, n.dot(point))
    }

    /// Plane through three points.
    ///
    /// With `right_handed` the normal is `(p2 - p0) x (p1 - p0)`, otherwise
    /// `(p1 - p0) x (p2 - p0)`. Near-colinear points produce an unreliable
    /// normal and a warning; exactly colinear or coincident points give the
    /// +y plane through `p0`.
    pub fn from_points(p0: &Vec3, p1: &Vec3, p2: &Vec3, right_handed: bool) -> Self {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let n = if right_handed { e2.cross(&e1) } else { e1.cross(&e2) };

        let len_sq = n.norm_squared();
        if len_sq < DEGENERATE_NORMAL_SQ {
            warn!("plane from near-colinear points (|n|^2 = {:e})", len_sq);
        }
        if !(len_sq > 0.0 && len_sq.is_finite()) {
            // horizontal plane through p0
            return Self::new(Vec3::y(), p0.y);
        }

        let n = n / len_sq.sqrt();
        Self::new(n, n.dot(p0))
    }

    pub fn set(&mut self, normal: Vec3, distance: f32) -> &mut Self {
        self.v = Vec4::new(normal.x, normal.y, normal.z, distance);
        self
    }

    pub fn normal(&self) -> Vec3 {
        self.v.xyz()
    }

    pub fn distance(&self) -> f32 {
        self.v.w
    }

    pub fn as_vector(&self) -> &Vec4 {
        &self.v
    }

    pub fn dot_normal(&self, v: &Vec3) -> f32 {
        self.v.x * v.x + self.v.y * v.y + self.v.z * v.z
    }

    pub fn signed_distance(&self, point: &Vec3) -> f32 {
        self.dot_normal(point) - self.v.w
    }

    /// Signed distance of the sphere's center above this plane
    pub fn center_above(&self, sphere: &Sphere) -> f32 {
        self.signed_distance(&sphere.center())
    }

    pub fn is_point_above(&self, point: &Vec3) -> bool {
        self.signed_distance(point) > 0.0
    }

    /// True when all three points are strictly above (points on the plane excluded)
    pub fn is_triangle_above(&self, tri: &[Vec3; 3]) -> bool {
        tri.iter().all(|p| self.signed_distance(p) > 0.0)
    }

    /// True when all three points are strictly below (points on the plane excluded)
    pub fn is_triangle_below(&self, tri: &[Vec3; 3]) -> bool {
        tri.iter().all(|p| self.signed_distance(p) < 0.0)
    }

    /// Full affine transform, translation included.
    ///
    /// The plane is treated as the covector `(n, -d)` and multiplied by the
    /// inverse transpose of `mtx`, then renormalized. A singular matrix
    /// falls back to rotating the normal and moving the closest point.
    pub fn transform(&mut self, mtx: &Mat4) {
        if let Some(inverse) = mtx.try_inverse() {
            let covector = Vec4::new(self.v.x, self.v.y, self.v.z, -self.v.w);
            let t = inverse.transpose() * covector;
            let len = t.xyz().norm();
            if len > 0.0 {
                self.v = Vec4::new(t.x / len, t.y / len, t.z / len, -t.w / len);
                return;
            }
        }

        let p1 = mtx.transform_point(&(self.normal() * self.v.w).into());
        let n1 = (Transform::linear_part(mtx) * self.normal()).normalize();
        self.v = Vec4::new(n1.x, n1.y, n1.z, n1.dot(&p1.coords));
    }

    /// Rotates the normal by the linear part of `mtx`; translation and
    /// distance are left alone.
    pub fn rotate(&mut self, mtx: &Mat4) {
        let n = Transform::linear_part(mtx) * self.normal();
        self.v = Vec4::new(n.x, n.y, n.z, self.v.w);
    }

    pub fn rotate_quat(&mut self, rotation: &Quat) {
        let n = rotation * self.normal();
        self.v = Vec4::new(n.x, n.y, n.z, self.v.w);
    }

    /// Parameter `t` where `point + dir * t` meets the plane. This is the
    /// distance along `dir` when `dir` is unit length.
    pub fn time_to_plane_along_vector(&self, point: &Vec3, dir: &Vec3) -> f32 {
        (self.v.w - self.dot_normal(point)) / self.dot_normal(dir)
    }
}
