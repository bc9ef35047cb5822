//! Viewer configuration, loaded from TOML
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::import::ImportOptions;
use crate::scene::MotionLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_vertical_deg: f32,
    /// Cap on the horizontal field of view derived from the aspect ratio
    pub fov_horizontal_max_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Point the camera looks at; models are scaled to fit around it
    pub focus: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_vertical_deg: 60.0,
            fov_horizontal_max_deg: 120.0,
            near: 0.1,
            far: 8.0,
            focus: [0.0, 0.0, -4.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub max_instances: usize,
    pub initial_instances: usize,
    /// Angular speed range in degrees per second, before instance scaling
    pub min_angular_speed_deg: f32,
    pub max_angular_speed_deg: f32,
    pub linear_speed: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_instances: 8,
            initial_instances: 1,
            min_angular_speed_deg: 22.5,
            max_angular_speed_deg: 90.0,
            linear_speed: 0.5,
        }
    }
}

impl SceneConfig {
    /// Speed limits in radians; an inverted angular range is swapped
    pub fn motion_limits(&self) -> MotionLimits {
        let a = self.min_angular_speed_deg.to_radians();
        let b = self.max_angular_speed_deg.to_radians();
        MotionLimits {
            min_angular_speed: a.min(b),
            max_angular_speed: a.max(b),
            linear_speed: self.linear_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub yield_interval_us: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { yield_interval_us: 1000 }
    }
}

impl ImportConfig {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            yield_interval: Duration::from_micros(self.yield_interval_us),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub target_fps: u32,
    /// Width over height of one terminal cell
    pub cell_aspect: f32,
    pub show_grid: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            cell_aspect: 0.5,
            show_grid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub import: ImportConfig,
    pub render: RenderConfig,
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig(message)
}

impl CameraConfig {
    /// Rejects values the perspective projection cannot be built from
    pub fn validate(&self) -> Result<()> {
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            return Err(invalid(format!(
                "camera clip range must satisfy 0 < near < far (near {}, far {})",
                self.near, self.far
            )));
        }
        for (name, deg) in [
            ("fov_vertical_deg", self.fov_vertical_deg),
            ("fov_horizontal_max_deg", self.fov_horizontal_max_deg),
        ] {
            if !(deg > 0.0 && deg < 180.0) {
                return Err(invalid(format!("camera {} must be in (0, 180), got {}", name, deg)));
            }
        }
        Ok(())
    }
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        if self.scene.max_instances == 0 {
            return Err(invalid("scene max_instances must be at least 1".to_string()));
        }
        if !(self.render.cell_aspect > 0.0 && self.render.cell_aspect.is_finite()) {
            return Err(invalid(format!(
                "render cell_aspect must be positive, got {}",
                self.render.cell_aspect
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.import.options(), ImportOptions::default());
        assert_eq!(config.scene.motion_limits(), MotionLimits::default());
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
            [camera]
            fov_vertical_deg = 45.0
            focus = [0.0, 1.0, -6.0]

            [render]
            show_grid = true
        "#;
        let config = ViewerConfig::from_toml_str(text).unwrap();
        assert_eq!(config.camera.fov_vertical_deg, 45.0);
        assert_eq!(config.camera.focus, [0.0, 1.0, -6.0]);
        assert_eq!(config.camera.far, 8.0);
        assert!(config.render.show_grid);
        assert_eq!(config.render.target_fps, 30);
    }

    #[test]
    fn test_bad_toml_is_a_config_error() {
        let result = ViewerConfig::from_toml_str("[camera\nnear = ");
        assert!(matches!(result, Err(Error::Config(_))));

        let result = ViewerConfig::from_toml_str("[scene]\nmax_instances = \"many\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_inverted_angular_range_is_ordered() {
        use crate::scene::ScenePool;
        use crate::transform::Vec3;
        use rand::{rngs::StdRng, SeedableRng};

        let text = "[scene]\nmin_angular_speed_deg = 90.0\nmax_angular_speed_deg = 45.0";
        let config = ViewerConfig::from_toml_str(text).unwrap();
        let limits = config.scene.motion_limits();
        assert!(limits.min_angular_speed < limits.max_angular_speed);
        assert_eq!(limits.min_angular_speed, 45f32.to_radians());

        let mut pool = ScenePool::new(2, 2, limits);
        pool.reset(&mut StdRng::seed_from_u64(3), &Vec3::new(0.0, 0.0, -4.0), 1.0);
        assert_eq!(pool.active().len(), 2);
    }

    #[test]
    fn test_unusable_camera_is_rejected() {
        for text in [
            "[camera]\nnear = 5.0\nfar = 5.0",
            "[camera]\nnear = 0.0",
            "[camera]\nnear = 2.0\nfar = 1.0",
            "[camera]\nfov_vertical_deg = 0.0",
            "[camera]\nfov_horizontal_max_deg = 180.0",
            "[render]\ncell_aspect = 0.0",
            "[scene]\nmax_instances = 0",
        ] {
            let result = ViewerConfig::from_toml_str(text);
            assert!(matches!(result, Err(Error::InvalidConfig(_))), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = ViewerConfig::load("/nonexistent/wire3d.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
