/// Model discovery and loading with placeholder fallback
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use wire3d_core::import::{import_obj_file, import_obj_str, ImportOptions, ThreadYield};
use wire3d_core::IndexedMesh;

/// File names containing this are reference geometry, not models
const SKIP_MARKER: &str = "wire-";

/// Unit cube, outward-facing quads
pub const PLACEHOLDER_CUBE: &str = "\
# placeholder cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
f 5 6 7 8
f 2 1 4 3
f 6 2 3 7
f 1 5 8 4
f 8 7 3 4
f 1 2 6 5
";

/// Hexagonal prism along the y axis
pub const PLACEHOLDER_PRISM: &str = "\
# placeholder hexagonal prism
v 1 -1 0
v 0.5 -1 0.866025
v -0.5 -1 0.866025
v -1 -1 0
v -0.5 -1 -0.866025
v 0.5 -1 -0.866025
v 1 1 0
v 0.5 1 0.866025
v -0.5 1 0.866025
v -1 1 0
v -0.5 1 -0.866025
v 0.5 1 -0.866025
f 1 2 3 4 5 6
f 12 11 10 9 8 7
f 1 7 8 2
f 2 8 9 3
f 3 9 10 4
f 4 10 11 5
f 5 11 12 6
f 6 12 7 1
";

const PLACEHOLDERS: [(&str, &str); 2] = [("cube", PLACEHOLDER_CUBE), ("hexagonal prism", PLACEHOLDER_PRISM)];

/// Sorted `.obj` files in `dir`, skipping reference geometry
pub fn discover_models(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_obj = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("obj"));
        let skipped = path
            .file_name()
            .map_or(true, |name| name.to_string_lossy().contains(SKIP_MARKER));
        if is_obj && !skipped && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Cycles through model files, substituting placeholders for files that
/// cannot be loaded
#[derive(Debug, Default)]
pub struct ModelCatalog {
    paths: Vec<PathBuf>,
    next: usize,
    placeholders_shown: usize,
}

impl ModelCatalog {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    /// Catalog of the models in `dir`; empty (placeholders only) if the
    /// directory cannot be read
    pub fn scan(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        match discover_models(dir) {
            Ok(paths) => {
                info!("found {} models in {}", paths.len(), dir.display());
                Self::new(paths)
            }
            Err(e) => {
                warn!("cannot scan {}: {}", dir.display(), e);
                Self::default()
            }
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Clears `mesh` and fills it with the next model. Returns its name.
    pub fn load_next(&mut self, mesh: &mut IndexedMesh, options: &ImportOptions) -> String {
        if !self.paths.is_empty() {
            let path = &self.paths[self.next % self.paths.len()];
            self.next = (self.next + 1) % self.paths.len();

            mesh.clear();
            match import_obj_file(mesh, path, options, ThreadYield) {
                Ok(report) if report.is_success() => {
                    return display_name(path);
                }
                Ok(report) => warn!("{}: no vertices after {} lines", path.display(), report.lines),
                Err(e) => warn!("{}: {}", path.display(), e),
            }
        }
        self.load_placeholder(mesh, options)
    }

    fn load_placeholder(&mut self, mesh: &mut IndexedMesh, options: &ImportOptions) -> String {
        let (name, text) = PLACEHOLDERS[self.placeholders_shown % PLACEHOLDERS.len()];
        self.placeholders_shown += 1;

        mesh.clear();
        import_obj_str(mesh, text, options);
        format!("placeholder {}", name)
    }
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire3d_core::transform::Vec3;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wire3d-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn assert_outward(mesh: &IndexedMesh) {
        let center = mesh.compute_extents().center();
        for face in mesh.faces() {
            let normal = *mesh.normal(face.normal.unwrap());
            let indices = mesh.face_indices(face);
            let centroid = indices
                .iter()
                .fold(Vec3::zeros(), |acc, &i| acc + mesh.position(i))
                / indices.len() as f32;
            assert!(normal.dot(&(centroid - center)) > 0.0);
        }
    }

    #[test]
    fn test_placeholder_cube() {
        let mut mesh = IndexedMesh::new();
        let report = import_obj_str(&mut mesh, PLACEHOLDER_CUBE, &ImportOptions::default());
        assert!(report.is_success());
        assert_eq!(mesh.position_count(), 8);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.normal_count(), 6);
        assert_outward(&mesh);
    }

    #[test]
    fn test_placeholder_prism() {
        let mut mesh = IndexedMesh::new();
        let report = import_obj_str(&mut mesh, PLACEHOLDER_PRISM, &ImportOptions::default());
        assert!(report.is_success());
        assert_eq!(mesh.position_count(), 12);
        assert_eq!(mesh.face_count(), 8);
        assert_eq!(mesh.normal_count(), 8);
        assert_outward(&mesh);
    }

    #[test]
    fn test_empty_catalog_alternates_placeholders() {
        let mut catalog = ModelCatalog::default();
        let mut mesh = IndexedMesh::new();
        let options = ImportOptions::default();

        assert_eq!(catalog.load_next(&mut mesh, &options), "placeholder cube");
        assert_eq!(mesh.position_count(), 8);
        assert_eq!(catalog.load_next(&mut mesh, &options), "placeholder hexagonal prism");
        assert_eq!(mesh.position_count(), 12);
        assert_eq!(catalog.load_next(&mut mesh, &options), "placeholder cube");
    }

    #[test]
    fn test_discover_and_load() {
        let dir = scratch_dir("discover");
        fs::write(dir.join("b.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        fs::write(dir.join("a.OBJ"), "# nothing usable\n").unwrap();
        fs::write(dir.join("wire-grid.obj"), "v 0 0 0\n").unwrap();
        fs::write(dir.join("notes.txt"), "v 0 0 0\n").unwrap();

        let paths = discover_models(&dir).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.OBJ", "b.obj"]);

        let mut catalog = ModelCatalog::new(paths);
        let mut mesh = IndexedMesh::new();
        let options = ImportOptions::default();
        // a.OBJ has no vertices
        assert_eq!(catalog.load_next(&mut mesh, &options), "placeholder cube");
        assert_eq!(catalog.load_next(&mut mesh, &options), "b");
        assert_eq!(mesh.position_count(), 3);
        assert_eq!(mesh.face_count(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_scans_empty() {
        let catalog = ModelCatalog::scan("/nonexistent/wire3d-models");
        assert!(catalog.paths().is_empty());
    }
}
