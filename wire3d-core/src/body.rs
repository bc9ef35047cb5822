//! Hierarchical transform nodes kept in an arena.
//!
//! Each [`Body`] caches four overlapping descriptions of its pose: a
//! world matrix, a quaternion, Euler angles and a world bounding sphere.
//! One of them is authoritative (see [`PoseSource`]); the others are
//! rebuilt on first read after a change, tracked by [`Dirty`] bits.
//!
//! Parent, child and sibling relations are plain [`BodyKey`]s. A child may
//! carry a [`ParentLink`], in which case its world matrix is
//! `parent_world * link` and it follows its parent. Children without a link
//! are only grouped under the parent and keep their own world pose.
use std::fmt;

use bitflags::bitflags;
use log::debug;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::geometry::Sphere;
use crate::transform::{EulerAngles, Mat4, Quat, Transform, Vec3};

new_key_type! {
    /// Stable handle to a [`Body`] inside a [`BodyArena`]
    pub struct BodyKey;
}

bitflags! {
    /// Cached representations that are stale
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Dirty: u32 {
        const MATRIX = 1 << 0;
        const QUATERNION = 1 << 1;
        const EULER = 1 << 2;
        const BOUNDING_SPHERE = 1 << 3;
        /// Geometry changed; the owner should supply a new relative sphere
        const RELATIVE_SPHERE = 1 << 4;
        /// World matrix depends on a parent that changed
        const INTERNAL_DEPENDENCY = 1 << 5;

        const POSE = Self::MATRIX.bits()
            | Self::QUATERNION.bits()
            | Self::EULER.bits()
            | Self::BOUNDING_SPHERE.bits();
    }
}

/// Which representation was written last and is therefore authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSource {
    Matrix,
    Quaternion,
    Euler,
    /// World matrix comes from the parent and the installed [`ParentLink`]
    Link,
}

impl PoseSource {
    /// The dirty bit that can never be set while this source is authoritative
    fn own_flag(self) -> Dirty {
        match self {
            PoseSource::Matrix => Dirty::MATRIX,
            PoseSource::Quaternion => Dirty::QUATERNION,
            PoseSource::Euler => Dirty::EULER,
            PoseSource::Link => Dirty::empty(),
        }
    }
}

/// When a relative transform is handed to a [`ParentLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    /// Applied before the current relative transform (parent frame)
    Pre,
    /// Replaces the relative transform
    Set,
    /// Applied after the current relative transform (local frame)
    Post,
}

/// Rule computing a body's transform relative to its parent
pub trait ParentLink: fmt::Debug {
    /// Left-multiplies `m` by the local-to-parent transform.
    /// Called with identity to obtain the transform itself.
    fn to_parent_frame(&self, m: &mut Mat4);

    /// Left-multiplies `m` by the parent-to-local transform
    fn from_parent_frame(&self, m: &mut Mat4) {
        let mut to_parent = Mat4::identity();
        self.to_parent_frame(&mut to_parent);
        if let Some(inverse) = to_parent.try_inverse() {
            *m = inverse * *m;
        }
    }

    /// Offers a new relative transform. Returns false when the rule does
    /// not accept modifications, in which case nothing changed.
    fn modify_relative_transform(&mut self, _relative: &Mat4, _stage: LinkStage) -> bool {
        false
    }
}

/// Child sits exactly on its parent and cannot be moved relative to it
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLink;

impl ParentLink for IdentityLink {
    fn to_parent_frame(&self, _m: &mut Mat4) {}

    fn from_parent_frame(&self, _m: &mut Mat4) {}
}

/// Fixed rigid offset from the parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetLink {
    offset: Mat4,
}

impl OffsetLink {
    pub fn new(offset: Mat4) -> Self {
        Self { offset }
    }

    pub fn from_translation(offset: &Vec3) -> Self {
        Self::new(Mat4::new_translation(offset))
    }

    pub fn offset(&self) -> &Mat4 {
        &self.offset
    }
}

impl Default for OffsetLink {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

impl ParentLink for OffsetLink {
    fn to_parent_frame(&self, m: &mut Mat4) {
        *m = self.offset * *m;
    }

    fn modify_relative_transform(&mut self, relative: &Mat4, stage: LinkStage) -> bool {
        self.offset = match stage {
            LinkStage::Pre => relative * self.offset,
            LinkStage::Set => *relative,
            LinkStage::Post => self.offset * relative,
        };
        true
    }
}

/// One node of the hierarchy
#[derive(Debug)]
pub struct Body {
    parent: Option<BodyKey>,
    first_child: Option<BodyKey>,
    sibling: Option<BodyKey>,
    link: Option<Box<dyn ParentLink>>,

    local_to_world: Mat4,
    quaternion: Quat,
    rotation: EulerAngles,
    position: Vec3,
    relative_sphere: Sphere,
    bounding_sphere: Sphere,

    source: PoseSource,
    dirty: Dirty,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            parent: None,
            first_child: None,
            sibling: None,
            link: None,
            local_to_world: Mat4::identity(),
            quaternion: Quat::identity(),
            rotation: EulerAngles::zero(),
            position: Vec3::zeros(),
            relative_sphere: Sphere::default(),
            bounding_sphere: Sphere::default(),
            source: PoseSource::Matrix,
            dirty: Dirty::empty(),
        }
    }
}

impl Body {
    pub fn source(&self) -> PoseSource {
        self.source
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }
}

/// Iterator over a body's direct children, most recently attached first
pub struct Children<'a> {
    arena: &'a BodyArena,
    next: Option<BodyKey>,
}

impl Iterator for Children<'_> {
    type Item = BodyKey;

    fn next(&mut self) -> Option<BodyKey> {
        let key = self.next?;
        self.next = self.arena.bodies[key].sibling;
        Some(key)
    }
}

/// Owner of every [`Body`].
///
/// # Panics
/// Methods taking a [`BodyKey`] panic if the key was never issued by this
/// arena or its body has been destroyed.
#[derive(Debug, Default)]
pub struct BodyArena {
    bodies: SlotMap<BodyKey, Body>,
}

impl BodyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root body with identity pose and a unit relative sphere
    pub fn insert(&mut self) -> BodyKey {
        self.bodies.insert(Body::default())
    }

    /// Detaches all children, then the body itself, and frees it
    pub fn destroy(&mut self, key: BodyKey) -> Option<Body> {
        if !self.bodies.contains_key(key) {
            return None;
        }
        self.detach_all_children(key);
        self.detach(key);
        self.bodies.remove(key)
    }

    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains_key(key)
    }

    pub fn get(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn is_dirty(&self, key: BodyKey, flags: Dirty) -> bool {
        self.bodies[key].dirty.intersects(flags)
    }

    // --- hierarchy ---

    pub fn parent(&self, key: BodyKey) -> Option<BodyKey> {
        self.bodies[key].parent
    }

    pub fn is_attached(&self, key: BodyKey) -> bool {
        self.bodies[key].parent.is_some()
    }

    pub fn children(&self, key: BodyKey) -> Children<'_> {
        Children {
            arena: self,
            next: self.bodies[key].first_child,
        }
    }

    /// True if `ancestor` is `key` or lies on its parent chain
    fn is_self_or_ancestor(&self, ancestor: BodyKey, key: BodyKey) -> bool {
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            if k == ancestor {
                return true;
            }
            cursor = self.bodies[k].parent;
        }
        false
    }

    /// Makes `child` the first child of `parent`, detaching it from any
    /// previous parent. With a link the child's world pose follows the
    /// parent from now on.
    pub fn attach(&mut self, parent: BodyKey, child: BodyKey, link: Option<Box<dyn ParentLink>>) -> Result<()> {
        if self.is_self_or_ancestor(child, parent) {
            return Err(Error::HierarchyCycle);
        }
        self.detach(child);

        let head = self.bodies[parent].first_child;
        self.bodies[parent].first_child = Some(child);

        let body = &mut self.bodies[child];
        body.parent = Some(parent);
        body.sibling = head;

        match link {
            Some(link) => {
                body.link = Some(link);
                body.source = PoseSource::Link;
                body.dirty |= Dirty::POSE | Dirty::INTERNAL_DEPENDENCY;
                self.invalidate_dependants(child);
            }
            None => {
                let stale = (Dirty::POSE) - body.source.own_flag();
                body.dirty |= stale;
            }
        }
        Ok(())
    }

    /// Removes `child` from its parent. A linked child keeps its current
    /// world pose, frozen into a matrix.
    pub fn detach(&mut self, child: BodyKey) {
        let Some(parent) = self.bodies[child].parent else {
            return;
        };
        let world = self.local_to_world(child);

        let next = self.bodies[child].sibling;
        if self.bodies[parent].first_child == Some(child) {
            self.bodies[parent].first_child = next;
        } else {
            let mut cursor = self.bodies[parent].first_child;
            while let Some(k) = cursor {
                if self.bodies[k].sibling == Some(child) {
                    self.bodies[k].sibling = next;
                    break;
                }
                cursor = self.bodies[k].sibling;
            }
        }

        let body = &mut self.bodies[child];
        body.parent = None;
        body.sibling = None;
        if body.link.take().is_some() {
            self.set_matrix(child, world);
        }
    }

    pub fn detach_all_children(&mut self, key: BodyKey) {
        while let Some(child) = self.bodies[key].first_child {
            self.detach(child);
        }
    }

    /// Call after changing a link's state behind the arena's back
    pub fn notify_link_change(&mut self, key: BodyKey) {
        if self.bodies[key].link.is_some() {
            self.bodies[key].dirty |= Dirty::POSE | Dirty::INTERNAL_DEPENDENCY;
            self.invalidate_dependants(key);
        }
    }

    /// Runs `f` on the body's link, then invalidates everything that
    /// depends on it. `None` when the body has no link.
    pub fn with_link_mut<R>(&mut self, key: BodyKey, f: impl FnOnce(&mut dyn ParentLink) -> R) -> Option<R> {
        let link = self.bodies[key].link.as_deref_mut()?;
        let result = f(link);
        self.notify_link_change(key);
        Some(result)
    }

    // --- invalidation ---

    /// Marks the world pose of every linked descendant stale.
    /// Unlinked children do not depend on their parent and stop the walk.
    fn invalidate_dependants(&mut self, key: BodyKey) {
        let mut stack: Vec<BodyKey> = self.children(key).collect();
        while let Some(k) = stack.pop() {
            if self.bodies[k].link.is_none() {
                continue;
            }
            self.bodies[k].dirty |= Dirty::POSE | Dirty::INTERNAL_DEPENDENCY;
            stack.extend(self.children(k));
        }
    }

    /// Switches the authoritative source and marks every other pose
    /// representation stale
    fn set_source(&mut self, key: BodyKey, source: PoseSource) {
        let body = &mut self.bodies[key];
        body.source = source;
        body.dirty |= Dirty::POSE;
        body.dirty.remove(source.own_flag());
        self.invalidate_dependants(key);
    }

    // --- setters ---

    pub fn set_position(&mut self, key: BodyKey, position: Vec3) {
        if self.bodies[key].link.is_some() {
            let mut world = self.local_to_world(key);
            world.fixed_view_mut::<3, 1>(0, 3).copy_from(&position);
            self.set_linked_world(key, &world);
            return;
        }
        let body = &mut self.bodies[key];
        body.position = position;
        body.local_to_world.fixed_view_mut::<3, 1>(0, 3).copy_from(&position);
        body.dirty |= Dirty::BOUNDING_SPHERE;
        self.invalidate_dependants(key);
    }

    /// Sets the rotation from Euler angles, which become authoritative
    pub fn set_rotation(&mut self, key: BodyKey, rotation: EulerAngles) {
        if self.bodies[key].link.is_some() {
            let position = self.position(key);
            let world = Transform::from_rotation_translation(&rotation.to_quaternion(), &position);
            self.set_linked_world(key, &world);
            return;
        }
        self.bodies[key].rotation = rotation;
        self.set_source(key, PoseSource::Euler);
    }

    pub fn set_quaternion(&mut self, key: BodyKey, quaternion: Quat) {
        if self.bodies[key].link.is_some() {
            let position = self.position(key);
            let world = Transform::from_rotation_translation(&quaternion, &position);
            self.set_linked_world(key, &world);
            return;
        }
        self.bodies[key].quaternion = quaternion;
        self.set_source(key, PoseSource::Quaternion);
    }

    /// Sets the world matrix directly; position is taken from its last column
    pub fn set_matrix(&mut self, key: BodyKey, matrix: Mat4) {
        if self.bodies[key].link.is_some() {
            self.set_linked_world(key, &matrix);
            return;
        }
        let body = &mut self.bodies[key];
        body.local_to_world = matrix;
        body.position = Transform::translation(&matrix);
        self.set_source(key, PoseSource::Matrix);
    }

    pub fn identity(&mut self, key: BodyKey) {
        self.set_matrix(key, Mat4::identity());
    }

    /// Hands a desired world matrix to the link as a parent-relative transform
    fn set_linked_world(&mut self, key: BodyKey, world: &Mat4) {
        let parent_world = self.parent_world(key);
        let Some(parent_to_world_inv) = parent_world.try_inverse() else {
            debug!("parent matrix of linked body is singular; pose unchanged");
            return;
        };
        let relative = parent_to_world_inv * world;
        self.modify_link(key, &relative, LinkStage::Set);
    }

    fn modify_link(&mut self, key: BodyKey, relative: &Mat4, stage: LinkStage) {
        let accepted = self.bodies[key]
            .link
            .as_deref_mut()
            .map(|link| link.modify_relative_transform(relative, stage))
            .unwrap_or(false);
        if accepted {
            self.notify_link_change(key);
        } else {
            debug!("parent link rejected {:?} transform", stage);
        }
    }

    /// Applies `m` in the body's local frame: `world = world * m`
    pub fn mul_matrix(&mut self, key: BodyKey, m: &Mat4) {
        if self.bodies[key].link.is_some() {
            self.modify_link(key, m, LinkStage::Post);
            return;
        }
        let world = self.local_to_world(key) * m;
        self.set_matrix(key, world);
    }

    /// Applies `m` in world space: `world = m * world`
    pub fn pre_mul_matrix(&mut self, key: BodyKey, m: &Mat4) {
        if self.bodies[key].link.is_some() {
            // express m in the parent frame so the link sees P^-1 * m * P
            let parent_world = self.parent_world(key);
            let Some(inverse) = parent_world.try_inverse() else {
                debug!("parent matrix of linked body is singular; pose unchanged");
                return;
            };
            let relative = inverse * m * parent_world;
            self.modify_link(key, &relative, LinkStage::Pre);
            return;
        }
        let world = m * self.local_to_world(key);
        self.set_matrix(key, world);
    }

    /// Rotates about the body's own axes
    pub fn mul_quaternion(&mut self, key: BodyKey, q: &Quat) {
        let rotated = self.quaternion(key) * q;
        self.set_quaternion(key, rotated);
    }

    /// Rotates about the world axes; position is kept
    pub fn pre_mul_quaternion(&mut self, key: BodyKey, q: &Quat) {
        let rotated = q * self.quaternion(key);
        self.set_quaternion(key, rotated);
    }

    /// Turns the body so that [`BodyArena::forward`] points at `target`.
    /// Does nothing when `target` is the body's position.
    pub fn look_at(&mut self, key: BodyKey, target: &Vec3, up: &Vec3) {
        let dir = target - self.position(key);
        if dir.norm_squared() < f32::EPSILON {
            debug!("look_at target coincides with body position");
            return;
        }
        // look_at_rh maps dir onto -z; its inverse turns -z toward dir
        let q = Quat::look_at_rh(&dir, up).inverse();
        self.set_quaternion(key, q);
    }

    // --- relative sphere ---

    pub fn relative_bounding_sphere(&self, key: BodyKey) -> Sphere {
        self.bodies[key].relative_sphere
    }

    pub fn set_relative_bounding_sphere(&mut self, key: BodyKey, sphere: Sphere) {
        let body = &mut self.bodies[key];
        body.relative_sphere = sphere;
        body.dirty.remove(Dirty::RELATIVE_SPHERE);
        body.dirty |= Dirty::BOUNDING_SPHERE;
    }

    /// Flags the relative sphere as needing a new value from the geometry owner
    pub fn mark_geometry_changed(&mut self, key: BodyKey) {
        self.bodies[key].dirty |= Dirty::RELATIVE_SPHERE | Dirty::BOUNDING_SPHERE;
    }

    // --- lazy accessors ---

    fn parent_world(&mut self, key: BodyKey) -> Mat4 {
        match self.bodies[key].parent {
            Some(parent) => self.local_to_world(parent),
            None => Mat4::identity(),
        }
    }

    /// World matrix, rebuilt from the authoritative source if stale
    pub fn local_to_world(&mut self, key: BodyKey) -> Mat4 {
        let body = &self.bodies[key];
        if !body.dirty.intersects(Dirty::MATRIX | Dirty::INTERNAL_DEPENDENCY) {
            return body.local_to_world;
        }

        let source = body.source;
        let matrix = match source {
            PoseSource::Link => {
                let mut local = Mat4::identity();
                if let Some(link) = &body.link {
                    link.to_parent_frame(&mut local);
                }
                self.parent_world(key) * local
            }
            PoseSource::Euler => Transform::from_rotation_translation(&body.rotation.to_quaternion(), &body.position),
            PoseSource::Quaternion => Transform::from_rotation_translation(&body.quaternion, &body.position),
            PoseSource::Matrix => body.local_to_world,
        };

        let body = &mut self.bodies[key];
        body.local_to_world = matrix;
        if source == PoseSource::Link {
            body.position = Transform::translation(&matrix);
        }
        body.dirty.remove(Dirty::MATRIX | Dirty::INTERNAL_DEPENDENCY);
        matrix
    }

    pub fn position(&mut self, key: BodyKey) -> Vec3 {
        if self.bodies[key].source == PoseSource::Link {
            self.local_to_world(key);
        }
        self.bodies[key].position
    }

    pub fn quaternion(&mut self, key: BodyKey) -> Quat {
        let body = &self.bodies[key];
        if !body.dirty.contains(Dirty::QUATERNION) {
            return body.quaternion;
        }
        let q = if body.source == PoseSource::Euler {
            body.rotation.to_quaternion()
        } else {
            Transform::rotation_of(&self.local_to_world(key))
        };
        let body = &mut self.bodies[key];
        body.quaternion = q;
        body.dirty.remove(Dirty::QUATERNION);
        q
    }

    /// Euler angles in the crate convention, derived from the quaternion if stale
    pub fn rotation(&mut self, key: BodyKey) -> EulerAngles {
        if !self.bodies[key].dirty.contains(Dirty::EULER) {
            return self.bodies[key].rotation;
        }
        let e = EulerAngles::from_quaternion(&self.quaternion(key));
        let body = &mut self.bodies[key];
        body.rotation = e;
        body.dirty.remove(Dirty::EULER);
        e
    }

    /// Relative sphere carried into world space by the body's matrix
    pub fn bounding_sphere(&mut self, key: BodyKey) -> Sphere {
        if !self.bodies[key].dirty.contains(Dirty::BOUNDING_SPHERE) {
            return self.bodies[key].bounding_sphere;
        }
        let world = self.local_to_world(key);
        let body = &mut self.bodies[key];
        body.bounding_sphere = body.relative_sphere.transformed(&world);
        body.dirty.remove(Dirty::BOUNDING_SPHERE);
        body.bounding_sphere
    }

    pub fn is_position_valid(&mut self, key: BodyKey) -> bool {
        let p = self.position(key);
        p.iter().all(|c| c.is_finite())
    }

    // --- directions ---

    fn axis(&mut self, key: BodyKey, column: usize) -> Vec3 {
        let m = self.local_to_world(key);
        Vec3::new(m[(0, column)], m[(1, column)], m[(2, column)]).normalize()
    }

    pub fn right(&mut self, key: BodyKey) -> Vec3 {
        self.axis(key, 0)
    }

    pub fn left(&mut self, key: BodyKey) -> Vec3 {
        -self.axis(key, 0)
    }

    pub fn up(&mut self, key: BodyKey) -> Vec3 {
        self.axis(key, 1)
    }

    pub fn down(&mut self, key: BodyKey) -> Vec3 {
        -self.axis(key, 1)
    }

    /// Local -z, matching the camera convention
    pub fn forward(&mut self, key: BodyKey) -> Vec3 {
        -self.axis(key, 2)
    }

    pub fn backward(&mut self, key: BodyKey) -> Vec3 {
        self.axis(key, 2)
    }
}
