/// Character-cell wireframe renderer
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use wire3d_core::mesh::{IndexedMesh, WireMesh};
use wire3d_core::transform::{Mat4, Transform, Vec3, Vec4};
use wire3d_core::Camera;

/// Draws projected edges into a grid of terminal cells
pub struct WireRenderer {
    width: usize,
    height: usize,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl WireRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    pub fn char_at(&self, x: usize, y: usize) -> char {
        self.char_buffer[y * self.width + x]
    }

    /// Draws the edges of every face turned toward the camera
    pub fn render_mesh(&mut self, mesh: &IndexedMesh, local_to_world: &Mat4, camera: &Camera, color: Color) {
        let local_to_view = camera.view_matrix() * local_to_world;
        let normal_to_view = Transform::linear_part(&local_to_view)
            .try_inverse()
            .map(|m| m.transpose());
        let local_to_clip = camera.local_to_clip(local_to_world);

        let screen: Vec<Vec3> = mesh
            .positions()
            .iter()
            .map(|p| camera.project(p, &local_to_clip))
            .collect();

        for face in mesh.faces() {
            let indices = mesh.face_indices(face);
            let (Some(&first), Some(normal_to_view)) = (indices.first(), normal_to_view.as_ref()) else {
                continue;
            };
            if let Some(n) = face.normal {
                let n_view = normal_to_view * mesh.normal(n);
                let p = mesh.position(first);
                let p_view = local_to_view * Vec4::new(p.x, p.y, p.z, 1.0);
                if n_view.dot(&p_view.xyz()) >= 0.0 {
                    continue;
                }
            }

            for (k, &i0) in indices.iter().enumerate() {
                let i1 = indices[(k + 1) % indices.len()];
                self.draw_edge(&screen[i0 as usize], &screen[i1 as usize], color);
            }
        }
    }

    /// Draws every line of a reference mesh
    pub fn render_wire(&mut self, wire: &WireMesh, local_to_world: &Mat4, camera: &Camera, color: Color) {
        let local_to_clip = camera.local_to_clip(local_to_world);
        for (a, b) in wire.lines() {
            let a = camera.project(a, &local_to_clip);
            let b = camera.project(b, &local_to_clip);
            self.draw_edge(&a, &b, color);
        }
    }

    /// Screen-space edge; skipped when either end is behind the camera
    fn draw_edge(&mut self, a: &Vec3, b: &Vec3, color: Color) {
        if a.z <= 0.0 || b.z <= 0.0 {
            return;
        }
        let ch = edge_char(b.x - a.x, b.y - a.y);
        if let Some((x0, y0, x1, y1)) = clip_line(a.x, a.y, b.x, b.y, self.width as f32, self.height as f32) {
            self.draw_line(x0 as i32, y0 as i32, x1 as i32, y1 as i32, ch, color);
        }
    }

    /// Bresenham line; cells outside the buffer are ignored
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, ch: char, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;

        loop {
            self.plot(x, y, ch, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn plot(&mut self, x: i32, y: i32, ch: char, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.char_buffer[idx] = ch;
        self.color_buffer[idx] = color;
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = Color::Reset;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx];
                if color != current {
                    writer.queue(SetForegroundColor(color))?;
                    current = color;
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Character approximating a screen-space direction (y grows downward)
fn edge_char(dx: f32, dy: f32) -> char {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ay * 2.0 < ax {
        '-'
    } else if ax * 2.0 < ay {
        '|'
    } else if (dx > 0.0) == (dy > 0.0) {
        '\\'
    } else {
        '/'
    }
}

/// Liang-Barsky clip of a segment to `[0, width) x [0, height)`
fn clip_line(x0: f32, y0: f32, x1: f32, y1: f32, width: f32, height: f32) -> Option<(f32, f32, f32, f32)> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let xmax = width - 0.5;
    let ymax = height - 0.5;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for (p, q) in [(-dx, x0), (dx, xmax - x0), (-dy, y0), (dy, ymax - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }
    }

    Some((x0 + t0 * dx, y0 + t0 * dy, x0 + t1 * dx, y0 + t1 * dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire3d_core::config::CameraConfig;
    use wire3d_core::transform::Quat;

    fn lit(renderer: &WireRenderer) -> usize {
        renderer.char_buffer.iter().filter(|&&c| c != ' ').count()
    }

    #[test]
    fn test_horizontal_line() {
        let mut r = WireRenderer::new(10, 3);
        r.draw_line(1, 1, 8, 1, '-', Color::White);
        assert_eq!(lit(&r), 8);
        assert_eq!(r.char_at(1, 1), '-');
        assert_eq!(r.char_at(8, 1), '-');
        assert_eq!(r.char_at(0, 1), ' ');
    }

    #[test]
    fn test_line_outside_buffer_is_ignored() {
        let mut r = WireRenderer::new(4, 4);
        r.draw_line(-5, -5, -1, 20, '|', Color::White);
        assert_eq!(lit(&r), 0);
    }

    #[test]
    fn test_edge_chars() {
        assert_eq!(edge_char(10.0, 1.0), '-');
        assert_eq!(edge_char(0.5, -8.0), '|');
        assert_eq!(edge_char(3.0, 3.0), '\\');
        assert_eq!(edge_char(3.0, -3.0), '/');
    }

    #[test]
    fn test_clip_line() {
        assert_eq!(clip_line(1.0, 1.0, 3.0, 2.0, 10.0, 10.0), Some((1.0, 1.0, 3.0, 2.0)));
        assert_eq!(clip_line(-5.0, -5.0, -1.0, -1.0, 10.0, 10.0), None);

        let (x0, y0, x1, y1) = clip_line(-10.0, 5.0, 20.0, 5.0, 10.0, 10.0).unwrap();
        assert!(x0.abs() < 1e-4);
        assert_eq!((y0, y1), (5.0, 5.0));
        assert!(x1 < 10.0 && x1 > 9.0);
    }

    #[test]
    fn test_cube_draws_only_front_faces() {
        let camera = Camera::new(&CameraConfig::default(), 80, 40, 0.5);
        let model = Transform::from_rotation_translation(&Quat::identity(), &camera.focus);
        let cube = IndexedMesh::cube(1.0);

        let mut r = WireRenderer::new(80, 40);
        r.render_mesh(&cube, &model, &camera, Color::White);
        // only the face toward the camera: a square outline around the center
        assert!(lit(&r) > 0);
        assert_eq!(r.char_at(40, 20), ' ');

        r.clear();
        assert_eq!(lit(&r), 0);
    }

    #[test]
    fn test_mesh_behind_camera_is_skipped() {
        let camera = Camera::new(&CameraConfig::default(), 80, 40, 0.5);
        let model = Transform::from_rotation_translation(&Quat::identity(), &Vec3::new(0.0, 0.0, 4.0));
        let mut r = WireRenderer::new(80, 40);
        r.render_mesh(&IndexedMesh::cube(1.0), &model, &camera, Color::White);
        assert_eq!(lit(&r), 0);
    }

    #[test]
    fn test_floor_grid() {
        let camera = Camera::new(&CameraConfig::default(), 80, 40, 0.5);
        let mut grid = WireMesh::new();
        grid.grid(-2.0, 2.0, 4, -2.0, 2.0, 4);
        let model = Transform::from_rotation_translation(&Quat::identity(), &Vec3::new(0.0, -1.0, -4.0));

        let mut r = WireRenderer::new(80, 40);
        r.render_wire(&grid, &model, &camera, Color::DarkGrey);
        assert!(lit(&r) > 0);
        // the floor is below the horizon
        assert!((0..80).all(|x| r.char_at(x, 0) == ' '));
    }
}
