/// Wire3D Core Library - scene math for a wireframe model viewer
///
/// This library holds the renderer-independent pieces: geometry primitives,
/// view frustum culling, a hierarchy of transform nodes, indexed meshes,
/// streaming OBJ import, and the bouncing-instance scene dynamics.

pub mod body;
pub mod config;
pub mod error;
pub mod frustum;
pub mod geometry;
pub mod import;
pub mod mesh;
pub mod projection;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use body::{BodyArena, BodyKey, IdentityLink, OffsetLink, ParentLink};
pub use config::ViewerConfig;
pub use error::{Error, Result};
pub use frustum::{Frustum, FrustumPlane, Intersection, PlaneMask};
pub use geometry::{Aabb, Plane, Sphere};
pub use mesh::{IndexedMesh, WireMesh};
pub use projection::Camera;
pub use scene::{SceneObject, ScenePool};
pub use transform::{EulerAngles, Transform};
