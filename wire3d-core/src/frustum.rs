//! View frustum: six inward-facing planes plus an enclosing sphere
use bitflags::bitflags;
use nalgebra::Perspective3;

use crate::error::{Error, Result};
use crate::geometry::{screen_to_world, Aabb, Plane, Sphere};
use crate::transform::{Mat4, Vec3};

/// Plane slots in a [`Frustum`]. `Far` must stay last: [`Frustum::is_visible_far`]
/// relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    Left = 0,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

impl FrustumPlane {
    pub const COUNT: usize = 6;

    pub const ALL: [FrustumPlane; Self::COUNT] = [
        FrustumPlane::Left,
        FrustumPlane::Right,
        FrustumPlane::Bottom,
        FrustumPlane::Top,
        FrustumPlane::Near,
        FrustumPlane::Far,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrustumPlane::Left => "LEFT",
            FrustumPlane::Right => "RIGHT",
            FrustumPlane::Bottom => "BOTTOM",
            FrustumPlane::Top => "TOP",
            FrustumPlane::Near => "NEAR",
            FrustumPlane::Far => "FAR",
        }
    }
}

bitflags! {
    /// Selects a subset of frustum planes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PlaneMask: u32 {
        const LEFT = 1 << FrustumPlane::Left as u32;
        const RIGHT = 1 << FrustumPlane::Right as u32;
        const BOTTOM = 1 << FrustumPlane::Bottom as u32;
        const TOP = 1 << FrustumPlane::Top as u32;
        const NEAR = 1 << FrustumPlane::Near as u32;
        const FAR = 1 << FrustumPlane::Far as u32;

        const EDGES = Self::LEFT.bits() | Self::RIGHT.bits() | Self::BOTTOM.bits() | Self::TOP.bits();
        const Z = Self::NEAR.bits() | Self::FAR.bits();
        const ALL = Self::EDGES.bits() | Self::Z.bits();
    }
}

/// Result of classifying a sphere against a frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    Outside,
    Partial,
    Inside,
}

/// World-space frustum, rebuilt wholesale whenever the projection or view changes
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    viewpoint: Vec3,
    bounding_sphere: Sphere,
    planes: [Plane; FrustumPlane::COUNT],
}

impl Frustum {
    /// Builds the frustum of a perspective `projection` between view depths
    /// `near` and `far`. `view_to_world` is the camera's world transform
    /// (identity when `None`).
    pub fn new(near: f32, far: f32, projection: &Mat4, view_to_world: Option<&Mat4>) -> Result<Self> {
        let inverse = projection.try_inverse().ok_or(Error::SingularProjection)?;
        Ok(Self::from_inverse(near, far, projection, &inverse, view_to_world))
    }

    /// Same as [`Frustum::new`] with the projection inverse supplied by the caller
    pub fn from_inverse(
        near: f32,
        far: f32,
        view_to_screen: &Mat4,
        screen_to_view: &Mat4,
        view_to_world: Option<&Mat4>,
    ) -> Self {
        let identity = Mat4::identity();
        let view_to_world = view_to_world.unwrap_or(&identity);
        let viewpoint = view_to_world.transform_point(&Vec3::zeros().into()).coords;

        let rh = view_to_screen[(3, 2)] < 0.0;
        let corners = [
            Vec3::new(-1.0, -1.0, near), // bottom-left (near)
            Vec3::new(1.0, -1.0, near),  // bottom-right
            Vec3::new(-1.0, 1.0, near),  // top-left
            Vec3::new(1.0, 1.0, near),   // top-right
            Vec3::new(-1.0, -1.0, far),  // bottom-left (far)
            Vec3::new(1.0, -1.0, far),
            Vec3::new(-1.0, 1.0, far),
            Vec3::new(1.0, 1.0, far),
        ];
        let v = screen_to_world(&corners, view_to_screen, screen_to_view, Some(view_to_world));

        let bounding_sphere = sphere_from_points(&v);

        // normals point into the frustum interior
        let plane = |a: usize, b: usize, c: usize| Plane::from_points(&v[a], &v[b], &v[c], rh);
        let planes = [
            plane(2, 6, 4), // left
            plane(7, 3, 1), // right
            plane(5, 1, 0), // bottom
            plane(7, 6, 2), // top
            plane(3, 2, 0), // near
            plane(7, 4, 6), // far
        ];

        Self {
            viewpoint,
            bounding_sphere,
            planes,
        }
    }

    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    pub fn planes(&self) -> &[Plane; FrustumPlane::COUNT] {
        &self.planes
    }

    pub fn bounding_sphere(&self) -> &Sphere {
        &self.bounding_sphere
    }

    pub fn viewpoint(&self) -> &Vec3 {
        &self.viewpoint
    }

    /// True when `sphere` touches the bounding sphere and extends above every plane
    pub fn is_visible(&self, sphere: &Sphere) -> bool {
        sphere.intersects(&self.bounding_sphere) && self.planes.iter().all(|p| sphere.extends_above_plane(p))
    }

    /// Visibility ignoring the far plane (and the bounding sphere, which encloses it)
    pub fn is_visible_far(&self, sphere: &Sphere) -> bool {
        self.planes[..FrustumPlane::COUNT - 1]
            .iter()
            .all(|p| sphere.extends_above_plane(p))
    }

    /// Visibility against the selected planes only
    pub fn is_visible_masked(&self, sphere: &Sphere, mask: PlaneMask) -> bool {
        FrustumPlane::ALL
            .iter()
            .zip(self.planes.iter())
            .filter(|(which, _)| mask.bits() & (1 << **which as u32) != 0)
            .all(|(_, p)| sphere.extends_above_plane(p))
    }

    /// Classifies `sphere` as inside, partially inside or outside.
    ///
    /// Once one plane reports partial overlap the result stays `Partial`;
    /// the remaining planes are only checked for outright rejection.
    pub fn intersection(&self, sphere: &Sphere) -> Intersection {
        if !sphere.intersects(&self.bounding_sphere) {
            return Intersection::Outside;
        }

        let radius = sphere.radius();
        let mut result = Intersection::Inside;
        for plane in &self.planes {
            let distance = sphere.center_above_plane(plane);
            if distance < -radius {
                return Intersection::Outside;
            }
            if result == Intersection::Inside && distance < radius {
                result = Intersection::Partial;
            }
        }
        result
    }
}

impl Default for Frustum {
    fn default() -> Self {
        let perspective = Perspective3::new(1.0, std::f32::consts::FRAC_PI_3, 1.0, 100.0);
        Self::from_inverse(1.0, 100.0, perspective.as_matrix(), &perspective.inverse(), None)
    }
}

/// Sphere around the box of `points`: centered on the box, reaching the
/// farthest point. Conservative, not minimal.
fn sphere_from_points(points: &[Vec3]) -> Sphere {
    let Some(bounds) = Aabb::from_points(points) else {
        return Sphere::at_origin(0.0);
    };
    let center = bounds.center();
    let radius_sq = points
        .iter()
        .map(|p| (p - center).norm_squared())
        .fold(0.0f32, f32::max);
    Sphere::new(center, radius_sq.sqrt())
}
