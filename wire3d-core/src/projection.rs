/// Camera and projection utilities
use log::info;
use nalgebra::Isometry3;

use crate::config::CameraConfig;
use crate::error::{Error, Result};
use crate::frustum::Frustum;
use crate::mesh::IndexedMesh;
use crate::transform::{Mat4, Point, Transform, Vec3, Vec4};

/// Perspective camera looking from `position` at `focus`
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub focus: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_vertical: f32,
    /// Cap on the horizontal field of view in radians
    pub fov_horizontal_max: f32,
    pub near: f32,
    pub far: f32,
    width: u32,
    height: u32,
    /// Width over height of one pixel (or terminal cell)
    pixel_aspect: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32, pixel_aspect: f32) -> Self {
        let [fx, fy, fz] = config.focus;
        Self {
            position: Vec3::zeros(),
            focus: Vec3::new(fx, fy, fz),
            up: Vec3::y(),
            fov_vertical: config.fov_vertical_deg.to_radians(),
            fov_horizontal_max: config.fov_horizontal_max_deg.to_radians(),
            near: config.near,
            far: config.far,
            width: width.max(1),
            height: height.max(1),
            pixel_aspect,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Physical width over height of the viewport
    pub fn aspect(&self) -> f32 {
        self.width as f32 * self.pixel_aspect / self.height as f32
    }

    /// Horizontal field of view implied by the aspect ratio, clamped
    pub fn fov_horizontal(&self) -> f32 {
        let h = 2.0 * ((0.5 * self.fov_vertical).tan() * self.aspect()).atan();
        h.min(self.fov_horizontal_max)
    }

    /// Vertical field of view actually used; narrower than configured when
    /// the horizontal clamp kicks in
    pub fn effective_fov_vertical(&self) -> f32 {
        let h = self.fov_horizontal();
        2.0 * ((0.5 * h).tan() / self.aspect()).atan()
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(&Point::from(self.position), &Point::from(self.focus), &self.up)
    }

    /// Camera's world transform
    pub fn view_to_world(&self) -> Mat4 {
        Isometry3::look_at_rh(&Point::from(self.position), &Point::from(self.focus), &self.up)
            .inverse()
            .to_homogeneous()
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect(), self.effective_fov_vertical(), self.near, self.far)
    }

    /// Maps NDC to screen coordinates: x to `[0, width]`, y down to
    /// `[0, height]`, z unchanged
    pub fn ndc_to_screen(&self) -> Mat4 {
        let w = self.width as f32 * 0.5;
        let h = self.height as f32 * 0.5;
        #[rustfmt::skip]
        let m = Mat4::new(
            w,   0.0, 0.0, w,
            0.0, -h,  0.0, h,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        m
    }

    pub fn local_to_clip(&self, local_to_world: &Mat4) -> Mat4 {
        Transform::mvp_matrix(local_to_world, &self.view_matrix(), &self.projection_matrix())
    }

    /// Screen position of a local point. The returned z is the view depth
    /// (clip w); it is zero or negative for points behind the camera, in
    /// which case x and y are meaningless.
    pub fn project(&self, point: &Vec3, local_to_clip: &Mat4) -> Vec3 {
        let clip = local_to_clip * Vec4::new(point.x, point.y, point.z, 1.0);
        if clip.w.abs() < 1e-6 {
            return Vec3::new(0.0, 0.0, clip.w);
        }
        let ndc = clip / clip.w;
        let screen = self.ndc_to_screen() * ndc;
        Vec3::new(screen.x, screen.y, clip.w)
    }

    /// Whether a perspective projection can be built from the current
    /// clip range, aspect and field of view
    pub fn has_valid_projection(&self) -> bool {
        let aspect = self.aspect();
        let fovy = self.effective_fov_vertical();
        self.near > 0.0
            && self.far > self.near
            && self.far.is_finite()
            && aspect > 0.0
            && aspect.is_finite()
            && fovy > 0.0
            && fovy < std::f32::consts::PI
    }

    /// World-space frustum of this camera
    pub fn frustum(&self) -> Result<Frustum> {
        if !self.has_valid_projection() {
            return Err(Error::SingularProjection);
        }
        Frustum::new(self.near, self.far, &self.projection_matrix(), Some(&self.view_to_world()))
    }

    /// Recenters `mesh` on the origin and scales it so it fills
    /// `fill_factor` of the view height when placed at the focus point.
    /// Returns the model's new radius, or `None` for an empty or
    /// zero-size mesh.
    pub fn fit_mesh_to_view(&self, mesh: &mut IndexedMesh, fill_factor: f32) -> Option<f32> {
        let extents = mesh.compute_extents();
        let center = extents.center();
        let radius = 0.5 * extents.dimensions().norm();
        if radius <= 0.0 {
            return None;
        }
        // a tighter bound when the corners of the box are empty
        let radius = radius.min(mesh.compute_extents_from(&center));

        let dist = (self.focus - self.position).norm();
        let mut ideal = dist * fill_factor * (0.5 * self.effective_fov_vertical()).tan();
        if ideal > dist - self.near {
            ideal = dist - self.near;
        }
        mesh.recenter_and_scale(&center, ideal / radius);
        info!("model radius {:.2} scaled to {:.2}", radius, ideal);
        Some(ideal)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), 800, 600, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::default();
        assert_relative_eq!(camera.aspect(), 800.0 / 600.0);
        assert_relative_eq!(camera.fov_vertical, 60f32.to_radians());
        assert_relative_eq!(camera.focus, Vec3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn test_terminal_cells_are_tall() {
        let camera = Camera::new(&CameraConfig::default(), 80, 40, 0.5);
        assert_relative_eq!(camera.aspect(), 1.0);
    }

    #[test]
    fn test_horizontal_fov_is_clamped() {
        let camera = Camera::new(&CameraConfig::default(), 400, 100, 1.0);
        assert_relative_eq!(camera.fov_horizontal(), 120f32.to_radians(), epsilon = 1e-5);
        assert!(camera.effective_fov_vertical() < camera.fov_vertical);

        let narrow = Camera::new(&CameraConfig::default(), 100, 100, 1.0);
        assert_relative_eq!(narrow.effective_fov_vertical(), narrow.fov_vertical, epsilon = 1e-5);
    }

    #[test]
    fn test_focus_projects_to_screen_center() {
        let camera = Camera::default();
        let m = camera.local_to_clip(&Mat4::identity());
        let s = camera.project(&camera.focus, &m);
        assert_relative_eq!(s.x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(s.y, 300.0, epsilon = 1e-3);
        assert_relative_eq!(s.z, 4.0, epsilon = 1e-5);

        // +y in the world is up on screen, i.e. a smaller row
        let above = camera.project(&(camera.focus + Vec3::y()), &m);
        assert!(above.y < s.y);

        let behind = camera.project(&Vec3::new(0.0, 0.0, 1.0), &m);
        assert!(behind.z < 0.0);
    }

    #[test]
    fn test_view_to_world_inverts_view() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(1.0, 2.0, 3.0);
        let product = camera.view_matrix() * camera.view_to_world();
        assert_relative_eq!(product, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_frustum_contains_focus() {
        let camera = Camera::default();
        let frustum = camera.frustum().unwrap();
        assert!(frustum.is_visible(&Sphere::new(camera.focus, 0.1)));
        assert!(!frustum.is_visible(&Sphere::new(Vec3::new(0.0, 0.0, 2.0), 0.1)));
        assert!(!frustum.is_visible(&Sphere::new(Vec3::new(0.0, 0.0, -9.0), 0.1)));
    }

    #[test]
    fn test_unusable_projection_is_an_error() {
        let mut camera = Camera::default();
        camera.near = 5.0;
        camera.far = 5.0;
        assert!(matches!(camera.frustum(), Err(Error::SingularProjection)));

        let mut camera = Camera::default();
        camera.near = 0.0;
        assert!(matches!(camera.frustum(), Err(Error::SingularProjection)));

        let flat = Camera::new(&CameraConfig::default(), 80, 40, 0.0);
        assert!(!flat.has_valid_projection());
        assert!(matches!(flat.frustum(), Err(Error::SingularProjection)));

        assert!(Camera::default().has_valid_projection());
    }

    #[test]
    fn test_fit_mesh_to_view() {
        let camera = Camera::default();
        let mut mesh = IndexedMesh::cube(10.0);
        mesh.recenter_and_scale(&Vec3::new(-3.0, 0.0, 0.0), 1.0);

        let radius = camera.fit_mesh_to_view(&mut mesh, 0.5).unwrap();
        assert_relative_eq!(radius, 4.0 * 0.5 * 30f32.to_radians().tan(), epsilon = 1e-5);
        assert_relative_eq!(mesh.compute_extents().center(), Vec3::zeros(), epsilon = 1e-5);
        assert_relative_eq!(mesh.compute_extents_from(&Vec3::zeros()), radius, epsilon = 1e-4);

        assert_eq!(camera.fit_mesh_to_view(&mut IndexedMesh::new(), 0.5), None);
    }
}
