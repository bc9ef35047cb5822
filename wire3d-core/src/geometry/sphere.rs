use super::{Aabb, Plane};
use crate::transform::{Mat4, Vec3, Vec4};

/// Sphere stored as `(center.xyz, radius)`. Radius 0 is a valid point-sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    v: Vec4,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative sphere radius {radius}");
        Self {
            v: Vec4::new(center.x, center.y, center.z, radius),
        }
    }

    pub fn at_origin(radius: f32) -> Self {
        Self::new(Vec3::zeros(), radius)
    }

    pub fn center(&self) -> Vec3 {
        self.v.xyz()
    }

    pub fn radius(&self) -> f32 {
        self.v.w
    }

    pub fn set(&mut self, center: Vec3, radius: f32) {
        *self = Self::new(center, radius);
    }

    pub fn set_center(&mut self, center: Vec3) {
        self.v.x = center.x;
        self.v.y = center.y;
        self.v.z = center.z;
    }

    pub fn set_radius(&mut self, radius: f32) {
        debug_assert!(radius >= 0.0, "negative sphere radius {radius}");
        self.v.w = radius;
    }

    pub fn translate(&mut self, offset: &Vec3) {
        self.set_center(self.center() + offset);
    }

    pub fn square_dist_from_center(&self, point: &Vec3) -> f32 {
        (point - self.center()).norm_squared()
    }

    /// True when the spheres touch or overlap
    pub fn intersects(&self, other: &Sphere) -> bool {
        self.intersects_sphere_at(&other.center(), other.radius())
    }

    pub fn intersects_sphere_at(&self, center: &Vec3, radius: f32) -> bool {
        let reach = self.radius() + radius;
        self.square_dist_from_center(center) <= reach * reach
    }

    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.square_dist_from_center(point) <= self.radius() * self.radius()
    }

    /// Signed distance of the center above `plane`
    pub fn center_above_plane(&self, plane: &Plane) -> f32 {
        plane.signed_distance(&self.center())
    }

    /// True when some part of the sphere is on or above `plane`
    pub fn extends_above_plane(&self, plane: &Plane) -> bool {
        self.center_above_plane(plane) >= -self.radius()
    }

    pub fn bounding_box(&self) -> Aabb {
        let r = Vec3::repeat(self.radius());
        let c = self.center();
        Aabb::new(c - r, c + r)
    }

    /// Time until the sphere surface first touches `plane` while moving
    /// with `velocity`, measured from the side the normal points to.
    pub fn time_to_plane_along_vector(&self, plane: &Plane, velocity: &Vec3) -> f32 {
        (self.radius() - self.center_above_plane(plane)) / plane.dot_normal(velocity)
    }

    /// Moves the center by `mtx`; the radius is not scaled
    pub fn transform(&mut self, mtx: &Mat4) {
        let c = mtx.transform_point(&self.center().into());
        self.set_center(c.coords);
    }

    pub fn transformed(&self, mtx: &Mat4) -> Self {
        let mut s = *self;
        s.transform(mtx);
        s
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self::at_origin(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_intersects_touching_spheres() {
        let a = Sphere::new(Vec3::zeros(), 1.0);
        let b = Sphere::new(Vec3::new(3.0, 0.0, 0.0), 2.0);
        let c = Sphere::new(Vec3::new(3.1, 0.0, 0.0), 2.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_point_sphere() {
        let p = Sphere::new(Vec3::new(1.0, 1.0, 1.0), 0.0);
        assert!(p.contains_point(&Vec3::new(1.0, 1.0, 1.0)));
        assert!(!p.contains_point(&Vec3::new(1.0, 1.0, 1.01)));
    }

    #[test]
    fn test_extends_above_plane() {
        let plane = Plane::new(Vec3::new(0.0, 1.0, 0.0), 0.0);
        let straddling = Sphere::new(Vec3::new(0.0, -0.5, 0.0), 1.0);
        let below = Sphere::new(Vec3::new(0.0, -1.5, 0.0), 1.0);
        let touching = Sphere::new(Vec3::new(0.0, -1.0, 0.0), 1.0);
        assert!(straddling.extends_above_plane(&plane));
        assert!(touching.extends_above_plane(&plane));
        assert!(!below.extends_above_plane(&plane));
        assert_relative_eq!(straddling.center_above_plane(&plane), -0.5);
    }

    #[test]
    fn test_transform_moves_center_only() {
        let mut s = Sphere::new(Vec3::new(1.0, 0.0, 0.0), 2.0);
        let mtx = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)) * Mat4::new_scaling(3.0);
        s.transform(&mtx);
        assert_relative_eq!(s.center(), Vec3::new(3.0, 5.0, 0.0));
        assert_relative_eq!(s.radius(), 2.0);
    }

    #[test]
    fn test_time_to_plane() {
        let plane = Plane::new(Vec3::new(0.0, 0.0, 1.0), 0.0);
        let s = Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0);
        let t = s.time_to_plane_along_vector(&plane, &Vec3::new(0.0, 0.0, -2.0));
        assert_relative_eq!(t, 2.0);
    }

    #[test]
    fn test_bounding_box() {
        let s = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let b = s.bounding_box();
        assert_relative_eq!(*b.min(), Vec3::new(0.5, 1.5, 2.5));
        assert_relative_eq!(*b.max(), Vec3::new(1.5, 2.5, 3.5));
    }
}
