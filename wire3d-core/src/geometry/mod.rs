//! Analytic geometry primitives used for culling and collision response

mod aabb;
mod plane;
mod screen;
mod segment;
mod sphere;

pub use aabb::Aabb;
pub use plane::Plane;
pub use screen::{screen_to_world, world_to_screen};
pub use segment::{CollisionNormal, LineStatus, Segment};
pub use sphere::Sphere;
