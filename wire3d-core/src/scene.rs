//! Moving instances bouncing around inside the view frustum
use log::{debug, warn};
use rand::Rng;

use crate::body::{BodyArena, BodyKey};
use crate::frustum::Frustum;
use crate::geometry::Sphere;
use crate::transform::{Mat4, Quat, Transform, Vec3};

/// Below this squared length an averaged reflection normal is unusable
const MIN_AVERAGE_NORMAL_SQ: f32 = 1.0e-4;

/// Palette instances pick their colour from
pub const STOCK_COLORS: [[u8; 3]; 18] = [
    [0, 0, 128],     // navy
    [0, 128, 0],     // dark green
    [0, 128, 128],   // dark cyan
    [128, 0, 0],     // maroon
    [128, 0, 128],   // purple
    [128, 128, 0],   // olive
    [211, 211, 211], // light grey
    [128, 128, 128], // dark grey
    [0, 0, 255],
    [0, 255, 0],
    [0, 255, 255],
    [255, 0, 0],
    [255, 0, 255],
    [255, 255, 0],
    [255, 255, 255],
    [255, 180, 0],   // orange
    [180, 255, 0],   // green-yellow
    [255, 192, 203], // pink
];

/// Outcome of [`SceneObject::reflect_at_frustum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflection {
    /// Not crossing any plane while moving outward
    None,
    Reflected,
    /// Crossing planes, but their normals averaged out or the object is
    /// already moving back inside
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub rotation: Quat,
    pub position: Vec3,
    /// Rotation axis scaled by rate in radians per second
    pub angular_velocity: Vec3,
    pub linear_velocity: Vec3,
    pub radius: f32,
    pub color: [u8; 3],
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            rotation: Quat::identity(),
            position: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            linear_velocity: Vec3::zeros(),
            radius: 1.0,
            color: [0, 255, 0],
        }
    }
}

impl SceneObject {
    pub fn local_to_world(&self) -> Mat4 {
        Transform::from_rotation_translation(&self.rotation, &self.position)
    }

    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new(self.position, self.radius)
    }

    /// Advances rotation and position by `dt` seconds
    pub fn update_transform(&mut self, dt: f32) {
        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.rotation = spin * self.rotation;
        self.position += self.linear_velocity * dt;
    }

    /// Bounces the linear velocity off every frustum plane the object is
    /// crossing while moving outward, using the average of their normals
    pub fn reflect_at_frustum(&mut self, frustum: &Frustum) -> Reflection {
        let sphere = self.bounding_sphere();
        let v = self.linear_velocity;

        let mut sum = Vec3::zeros();
        let mut count = 0usize;
        for plane in frustum.planes() {
            if sphere.center_above_plane(plane) < sphere.radius() {
                let n = plane.normal();
                if v.dot(&n) < 0.0 {
                    sum += n;
                    count += 1;
                }
            }
        }

        let normal = match count {
            0 => return Reflection::None,
            1 => sum,
            _ => {
                let average = sum / count as f32;
                if average.norm_squared() <= MIN_AVERAGE_NORMAL_SQ {
                    debug!("crossed plane normals cancel out");
                    return Reflection::Cancelled;
                }
                average.normalize()
            }
        };

        let v_perp = v.dot(&normal);
        if v_perp < 0.0 {
            self.linear_velocity = v - normal * (2.0 * v_perp);
            Reflection::Reflected
        } else {
            warn!("reflection cancelled: velocity not impacting average normal");
            Reflection::Cancelled
        }
    }
}

/// Uniformly distributed direction
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let len_sq = v.norm_squared();
        if len_sq > 1.0e-6 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

/// Random axis with a rate whose magnitude lies between `min_speed` and
/// `max_speed` (in either order) and whose sign is random
pub fn randomize_angular_velocity<R: Rng + ?Sized>(rng: &mut R, min_speed: f32, max_speed: f32) -> Vec3 {
    let axis = random_unit_vector(rng);
    let (min_speed, max_speed) = if min_speed <= max_speed {
        (min_speed, max_speed)
    } else {
        (max_speed, min_speed)
    };
    let range = max_speed - min_speed;
    let mut speed = rng.gen_range(-range..=range);
    if speed < 0.0 {
        speed -= min_speed;
    } else {
        speed += min_speed;
    }
    axis * speed
}

/// Speed limits for a pool reset, before scaling by the instance count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    /// Radians per second
    pub min_angular_speed: f32,
    pub max_angular_speed: f32,
    pub linear_speed: f32,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            min_angular_speed: 22.5f32.to_radians(),
            max_angular_speed: 90.0f32.to_radians(),
            linear_speed: 0.5,
        }
    }
}

/// Fixed set of instance slots of which a prefix is active.
///
/// Every slot is mirrored by a body grouped under one scene root, so
/// renderers can read resolved world matrices from the body arena.
#[derive(Debug)]
pub struct ScenePool {
    objects: Vec<SceneObject>,
    active: usize,
    limits: MotionLimits,
    arena: BodyArena,
    root: BodyKey,
    bodies: Vec<BodyKey>,
}

impl ScenePool {
    /// # Panics
    /// If `max_count` is zero.
    pub fn new(max_count: usize, active: usize, limits: MotionLimits) -> Self {
        assert!(max_count > 0, "scene pool needs at least one slot");
        let mut arena = BodyArena::new();
        let root = arena.insert();
        let mut bodies = Vec::with_capacity(max_count);
        for _ in 0..max_count {
            let body = arena.insert();
            // unlinked: grouped under the root, never a cycle
            if arena.attach(root, body, None).is_ok() {
                bodies.push(body);
            }
        }

        Self {
            objects: vec![SceneObject::default(); max_count],
            active: active.clamp(1, max_count),
            limits,
            arena,
            root,
            bodies,
        }
    }

    pub fn max_count(&self) -> usize {
        self.objects.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn set_active_count(&mut self, active: usize) {
        self.active = active.clamp(1, self.max_count());
    }

    /// 1, 2, ..., max, 1, ...
    pub fn cycle_active_count(&mut self) -> usize {
        self.active = self.active % self.max_count() + 1;
        self.active
    }

    pub fn active(&self) -> &[SceneObject] {
        &self.objects[..self.active]
    }

    pub fn active_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects[..self.active]
    }

    pub fn arena(&self) -> &BodyArena {
        &self.arena
    }

    pub fn root(&self) -> BodyKey {
        self.root
    }

    /// Scale applied to speeds so busier scenes move faster
    pub fn speed_factor(&self) -> f32 {
        2.0 * (1.0 + (self.active as f32).log2())
    }

    /// Puts every active object at `focus` with fresh random velocities,
    /// colour and the given radius
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R, focus: &Vec3, radius: f32) {
        let factor = self.speed_factor();
        let limits = self.limits;
        for obj in &mut self.objects[..self.active] {
            obj.rotation = Quat::identity();
            obj.position = *focus;
            obj.radius = radius;
            obj.angular_velocity = randomize_angular_velocity(
                rng,
                factor * limits.min_angular_speed,
                factor * limits.max_angular_speed,
            );
            obj.linear_velocity = random_unit_vector(rng) * (limits.linear_speed * factor);
            obj.color = STOCK_COLORS[rng.gen_range(0..STOCK_COLORS.len())];
        }
        debug!("reset {} instances (speed factor {:.2})", self.active, factor);
        self.sync_bodies();
    }

    /// Integrates every active object and bounces it off the frustum.
    /// Returns how many velocities were reflected.
    pub fn tick(&mut self, dt: f32, frustum: &Frustum) -> usize {
        let mut reflected = 0;
        for obj in &mut self.objects[..self.active] {
            obj.update_transform(dt);
            if obj.reflect_at_frustum(frustum) == Reflection::Reflected {
                reflected += 1;
            }
        }
        self.sync_bodies();
        reflected
    }

    fn sync_bodies(&mut self) {
        for (obj, &body) in self.objects[..self.active].iter().zip(&self.bodies) {
            self.arena.set_quaternion(body, obj.rotation);
            self.arena.set_position(body, obj.position);
            self.arena
                .set_relative_bounding_sphere(body, Sphere::at_origin(obj.radius));
        }
    }

    /// Resolved world matrix of active instance `index`
    pub fn instance_matrix(&mut self, index: usize) -> Mat4 {
        self.arena.local_to_world(self.bodies[index])
    }

    /// World bounding sphere of active instance `index`
    pub fn instance_sphere(&mut self, index: usize) -> Sphere {
        self.arena.bounding_sphere(self.bodies[index])
    }
}
