//! Batch conversion between screen space and world space
//!
//! A screen point is `(ndc_x, ndc_y, depth)` where `depth` is the positive
//! view-space distance in front of the camera. Only perspective
//! projections are supported: the depth coefficients come straight from
//! the projection matrix (`m22`, `m23`, and the sign of `m32`, which is
//! `-1` for right-handed and `+1` for left-handed projections).

use crate::transform::{Mat4, Vec3, Vec4};

/// `(q, b)` such that clip-space z is `q * depth + b`
fn depth_coefficients(view_to_screen: &Mat4) -> (f32, f32) {
    let q = view_to_screen[(2, 2)] * view_to_screen[(3, 2)];
    let b = view_to_screen[(2, 3)];
    (q, b)
}

/// Maps screen points to world space.
///
/// `screen_to_view` must be the inverse of `view_to_screen`;
/// `view_to_world` defaults to identity.
pub fn screen_to_world(
    screen: &[Vec3],
    view_to_screen: &Mat4,
    screen_to_view: &Mat4,
    view_to_world: Option<&Mat4>,
) -> Vec<Vec3> {
    let (q, b) = depth_coefficients(view_to_screen);
    let screen_to_world = match view_to_world {
        Some(v2w) => v2w * screen_to_view,
        None => *screen_to_view,
    };

    screen
        .iter()
        .map(|s| {
            let depth = s.z;
            let clip = Vec4::new(s.x * depth, s.y * depth, q * depth + b, depth);
            let world = screen_to_world * clip;
            if world.w.abs() > f32::EPSILON {
                world.xyz() / world.w
            } else {
                world.xyz()
            }
        })
        .collect()
}

/// Maps world points to screen space; the returned z is the view depth
/// (clip-space w). `world_to_view` defaults to identity.
pub fn world_to_screen(world: &[Vec3], view_to_screen: &Mat4, world_to_view: Option<&Mat4>) -> Vec<Vec3> {
    let to_screen = match world_to_view {
        Some(w2v) => view_to_screen * w2v,
        None => *view_to_screen,
    };

    world
        .iter()
        .map(|p| {
            let clip = to_screen * Vec4::new(p.x, p.y, p.z, 1.0);
            Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn perspective() -> Mat4 {
        Mat4::new_perspective(1.5, 1.0, 0.5, 20.0)
    }

    #[test]
    fn test_screen_to_world_depth() {
        let proj = perspective();
        let inv = proj.try_inverse().unwrap();
        let world = screen_to_world(&[Vec3::new(0.0, 0.0, 3.0)], &proj, &inv, None);
        // right-handed: the camera looks down -z
        assert_relative_eq!(world[0], Vec3::new(0.0, 0.0, -3.0), epsilon = 1e-4);
    }

    #[test]
    fn test_round_trip_with_view() {
        let proj = perspective();
        let inv = proj.try_inverse().unwrap();
        let view_to_world = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0))
            * Mat4::new_rotation(Vec3::new(0.0, 0.7, 0.0));
        let world_to_view = view_to_world.try_inverse().unwrap();

        let screen = vec![
            Vec3::new(-1.0, -1.0, 0.5),
            Vec3::new(0.25, -0.5, 4.0),
            Vec3::new(1.0, 1.0, 20.0),
        ];
        let world = screen_to_world(&screen, &proj, &inv, Some(&view_to_world));
        let back = world_to_screen(&world, &proj, Some(&world_to_view));
        for (a, b) in screen.iter().zip(back.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_left_handed_projection() {
        // mirror z of a right-handed projection to get a left-handed one
        let flip = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 1.0, -1.0));
        let proj = perspective() * flip;
        assert!(proj[(3, 2)] > 0.0);
        let inv = proj.try_inverse().unwrap();
        let world = screen_to_world(&[Vec3::new(0.0, 0.0, 2.0)], &proj, &inv, None);
        assert_relative_eq!(world[0], Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-4);
    }
}
