//! Numeric aliases, the project Euler convention, and basis helpers
use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3, Vector4};

pub type Vec3 = Vector3<f32>;
pub type Vec4 = Vector4<f32>;
pub type Mat4 = Matrix4<f32>;
pub type Quat = UnitQuaternion<f32>;
pub type Point = Point3<f32>;

/// Euler rotation in radians around the x, y and z axes.
///
/// The whole crate composes these as `R = Rz(z) * Ry(y) * Rx(x)`
/// (x applied first). Conversions to and from quaternions and matrices
/// all go through [`EulerAngles::to_quaternion`] and
/// [`EulerAngles::from_quaternion`] so the convention cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerAngles {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn to_quaternion(&self) -> Quat {
        // nalgebra's (roll, pitch, yaw) is exactly Rz * Ry * Rx
        Quat::from_euler_angles(self.x, self.y, self.z)
    }

    pub fn from_quaternion(q: &Quat) -> Self {
        let (x, y, z) = q.euler_angles();
        Self { x, y, z }
    }

    pub fn as_vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from Euler angles
    pub fn rotation_matrix(rotation: &EulerAngles) -> Mat4 {
        let rx = Mat4::new_rotation(Vec3::new(rotation.x, 0.0, 0.0));
        let ry = Mat4::new_rotation(Vec3::new(0.0, rotation.y, 0.0));
        let rz = Mat4::new_rotation(Vec3::new(0.0, 0.0, rotation.z));

        // Apply rotations in order: Z, Y, X
        rz * ry * rx
    }

    /// Rigid transform from a rotation and a translation
    pub fn from_rotation_translation(rotation: &Quat, translation: &Vec3) -> Mat4 {
        let mut m = rotation.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        m
    }

    pub fn translation(m: &Mat4) -> Vec3 {
        Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }

    /// Upper 3x3 block, i.e. the matrix without its translation
    pub fn linear_part(m: &Mat4) -> Matrix3<f32> {
        m.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Rotation of a matrix whose linear part is orthonormal
    pub fn rotation_of(m: &Mat4) -> Quat {
        Quat::from_matrix(&Self::linear_part(m))
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(model: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
        projection * view * model
    }
}

/// Given a unit normal `n`, returns `(p, q)` such that `n`, `p`, `q` are
/// mutually perpendicular, `p` is unit length and `q == n x p`.
pub fn plane_space(n: &Vec3) -> (Vec3, Vec3) {
    if n.z.abs() > std::f32::consts::FRAC_1_SQRT_2 {
        // choose p in the y-z plane
        let a = n.y * n.y + n.z * n.z;
        let k = 1.0 / a.sqrt();
        let p = Vec3::new(0.0, -n.z * k, n.y * k);
        let q = Vec3::new(a * k, -n.x * p.z, n.x * p.y);
        (p, q)
    } else {
        // choose p in the x-y plane
        let a = n.x * n.x + n.y * n.y;
        let k = 1.0 / a.sqrt();
        let p = Vec3::new(-n.y * k, n.x * k, 0.0);
        let q = Vec3::new(-n.z * p.y, n.z * p.x, a * k);
        (p, q)
    }
}

/// Orthonormal basis with x along `a`, y along the part of `b`
/// perpendicular to `a`, and z = x cross y. `a` and `b` must be non-zero
/// and not colinear.
pub fn plane_space_basis(a: &Vec3, b: &Vec3) -> Mat4 {
    let i = a.normalize();
    let j = (b - i * i.dot(b)).normalize();
    let k = i.cross(&j);

    let mut basis = Mat4::identity();
    basis.fixed_view_mut::<3, 1>(0, 0).copy_from(&i);
    basis.fixed_view_mut::<3, 1>(0, 1).copy_from(&j);
    basis.fixed_view_mut::<3, 1>(0, 2).copy_from(&k);
    basis
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euler_rotate() {
        let mut state = EulerAngles::zero();
        assert_eq!(state.x, 0.0);

        state.rotate(0.1, 0.2, 0.3);
        assert!((state.x - 0.1).abs() < 1e-6);
        assert!((state.y - 0.2).abs() < 1e-6);
        assert!((state.z - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_identity_rotation() {
        let matrix = Transform::rotation_matrix(&EulerAngles::zero());
        assert!((matrix - Mat4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_quaternion_matches_rotation_matrix() {
        let euler = EulerAngles::new(0.3, -0.4, 1.1);
        let from_quat = euler.to_quaternion().to_homogeneous();
        let from_axes = Transform::rotation_matrix(&euler);
        assert_relative_eq!(from_quat, from_axes, epsilon = 1e-5);
    }

    #[test]
    fn test_euler_round_trip() {
        let euler = EulerAngles::new(0.25, 0.5, -0.75);
        let back = EulerAngles::from_quaternion(&euler.to_quaternion());
        assert_relative_eq!(back.as_vector(), euler.as_vector(), epsilon = 1e-5);
    }

    #[test]
    fn test_plane_space_is_orthonormal() {
        for n in [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 2.0, 3.0).normalize(),
            Vec3::new(0.0, 1.0, 0.0),
        ] {
            let (p, q) = plane_space(&n);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(p.dot(&n), 0.0, epsilon = 1e-5);
            assert_relative_eq!(q, n.cross(&p), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_plane_space_basis() {
        let basis = plane_space_basis(&Vec3::new(2.0, 0.0, 0.0), &Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(basis, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_rigid_transform_round_trip() {
        let q = Quat::from_euler_angles(0.1, 0.2, 0.3);
        let t = Vec3::new(1.0, -2.0, 3.0);
        let m = Transform::from_rotation_translation(&q, &t);
        assert_relative_eq!(Transform::translation(&m), t);
        assert_relative_eq!(
            Transform::rotation_of(&m).to_rotation_matrix().into_inner(),
            q.to_rotation_matrix().into_inner(),
            epsilon = 1e-5
        );
    }
}
