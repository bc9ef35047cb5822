use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info};
use nom::{character::complete::i32 as parse_i32, number::complete::float, IResult};

use super::tokenizer::Tokenizer;
use crate::error::Result;
use crate::mesh::{Index, IndexedFace, IndexedMesh};
use crate::transform::Vec3;

/// Hands control back to the host scheduler during a long import
pub trait Yield {
    fn yield_now(&mut self);
}

/// Never yields; for tests and batch tools
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl Yield for NoYield {
    fn yield_now(&mut self) {}
}

/// Yields the current OS thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadYield;

impl Yield for ThreadYield {
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

impl<F: FnMut()> Yield for F {
    fn yield_now(&mut self) {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Minimum time between two yields
    pub yield_interval: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            yield_interval: Duration::from_micros(1000),
        }
    }
}

/// What an import did. Only [`ImportReport::is_success`] matters to callers
/// deciding whether to fall back to another model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub lines: usize,
    pub positions: usize,
    pub faces: usize,
    /// Distinct face normals in the mesh after indexing
    pub normals: usize,
    /// Malformed `v` lines and unknown tags
    pub skipped_lines: usize,
    /// Faces left with two or fewer usable indices
    pub rejected_faces: usize,
    pub yields: usize,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.positions > 0
    }
}

/// First token of a line
enum Record {
    Position,
    Face,
    Ignored,
    Unknown,
}

impl Record {
    fn classify(tag: &[u8]) -> Self {
        match tag {
            b"v" => Record::Position,
            b"f" => Record::Face,
            b"l" | b"vn" | b"o" => Record::Ignored,
            t if t.starts_with(b"#") => Record::Ignored,
            _ => Record::Unknown,
        }
    }
}

fn parse_float(token: &[u8]) -> Option<f32> {
    let result: IResult<&[u8], f32> = float(token);
    result.ok().map(|(_, v)| v)
}

/// Leading integer of a face token, so `7/3/2` and `7//2` read as 7
fn parse_index(token: &[u8]) -> Option<i32> {
    let result: IResult<&[u8], i32> = parse_i32(token);
    result.ok().map(|(_, v)| v)
}

/// 1-based index to 0-based; negative counts back from `count`, zero is invalid
fn resolve_index(index: i32, count: usize) -> Option<Index> {
    let resolved = match index {
        0 => return None,
        i if i < 0 => count as i64 + i as i64,
        i => i as i64 - 1,
    };
    (0..count as i64).contains(&resolved).then_some(resolved as Index)
}

/// Line-oriented reader for the supported OBJ subset: `v`, `f`, and the
/// ignored `l`, `vn`, `o` and `#` records
pub struct ObjImporter<'a, Y> {
    mesh: &'a mut IndexedMesh,
    options: ImportOptions,
    yielder: Y,
    report: ImportReport,
    last_yield: Instant,
}

impl<'a, Y: Yield> ObjImporter<'a, Y> {
    pub fn new(mesh: &'a mut IndexedMesh, options: ImportOptions, yielder: Y) -> Self {
        Self {
            mesh,
            options,
            yielder,
            report: ImportReport::default(),
            last_yield: Instant::now(),
        }
    }

    /// Reads the whole stream, appending to the mesh, then indexes face
    /// normals. Never fails; check [`ImportReport::is_success`].
    pub fn import<R: BufRead>(mut self, reader: R) -> ImportReport {
        let mut words = Tokenizer::new(reader);

        while !words.at_end_of_stream() {
            words.begin_line();
            self.process_line(&mut words);
            words.finish_line();
            self.report.lines += 1;
            self.maybe_yield();
        }

        self.mesh.compact_memory();
        self.mesh.index_face_normals();
        self.mesh.compact_memory();
        self.report.normals = self.mesh.normal_count();

        info!(
            "imported {} positions, {} faces, {} normals from {} lines ({} skipped, {} faces rejected)",
            self.report.positions,
            self.report.faces,
            self.report.normals,
            self.report.lines,
            self.report.skipped_lines,
            self.report.rejected_faces
        );
        self.report
    }

    fn maybe_yield(&mut self) {
        if self.last_yield.elapsed() >= self.options.yield_interval {
            self.yielder.yield_now();
            self.report.yields += 1;
            self.last_yield = Instant::now();
        }
    }

    fn process_line<R: BufRead>(&mut self, words: &mut Tokenizer<R>) {
        let Some(tag) = words.next_token() else {
            return;
        };
        match Record::classify(tag) {
            Record::Position => self.read_position(words),
            Record::Face => self.read_face(words),
            Record::Ignored => {}
            Record::Unknown => {
                debug!("line {}: unrecognized tag <{}>", self.report.lines + 1, words.token_lossy());
                self.report.skipped_lines += 1;
            }
        }
    }

    fn read_position<R: BufRead>(&mut self, words: &mut Tokenizer<R>) {
        let mut xyz = [0.0f32; 3];
        for c in &mut xyz {
            match words.next_token().and_then(parse_float) {
                Some(v) => *c = v,
                None => {
                    debug!("line {}: malformed vertex", self.report.lines + 1);
                    self.report.skipped_lines += 1;
                    return;
                }
            }
        }
        self.mesh.add_position(Vec3::new(xyz[0], xyz[1], xyz[2]));
        self.report.positions += 1;
    }

    fn read_face<R: BufRead>(&mut self, words: &mut Tokenizer<R>) {
        // vertices normally all precede the first face
        if self.mesh.face_count() == 0 {
            self.mesh.compact_memory();
        }

        let first = self.mesh.index_count();
        let count = self.mesh.position_count();
        while let Some(token) = words.next_token() {
            match parse_index(token).and_then(|i| resolve_index(i, count)) {
                Some(index) => self.mesh.add_index(index),
                None => debug!(
                    "line {}: dropping unusable face index <{}>",
                    self.report.lines + 1,
                    String::from_utf8_lossy(token)
                ),
            }
        }

        let used = self.mesh.index_count() - first;
        if used > 2 {
            self.mesh.add_face(IndexedFace {
                normal: None,
                first: first as Index,
                count: used as Index,
                degenerate: false,
            });
            self.report.faces += 1;
        } else {
            self.mesh.truncate_indices(first);
            self.report.rejected_faces += 1;
            debug!("line {}: ignoring face with {} usable indices", self.report.lines + 1, used);
        }
    }
}

/// Imports OBJ text from `reader` into `mesh`
pub fn import_obj<R: BufRead, Y: Yield>(
    mesh: &mut IndexedMesh,
    reader: R,
    options: &ImportOptions,
    yielder: Y,
) -> ImportReport {
    ObjImporter::new(mesh, options.clone(), yielder).import(reader)
}

pub fn import_obj_str(mesh: &mut IndexedMesh, text: &str, options: &ImportOptions) -> ImportReport {
    import_obj(mesh, text.as_bytes(), options, NoYield)
}

/// Imports an OBJ file. Failing to open the file is the only error; a file
/// without usable data returns an unsuccessful report instead.
pub fn import_obj_file<Y: Yield>(
    mesh: &mut IndexedMesh,
    path: impl AsRef<Path>,
    options: &ImportOptions,
    yielder: Y,
) -> Result<ImportReport> {
    let path = path.as_ref();
    let file = File::open(path)?;
    debug!("importing {}", path.display());
    Ok(import_obj(mesh, BufReader::new(file), options, yielder))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn import(text: &str) -> (IndexedMesh, ImportReport) {
        let mut mesh = IndexedMesh::new();
        let report = import_obj_str(&mut mesh, text, &ImportOptions::default());
        (mesh, report)
    }

    #[test]
    fn test_single_triangle() {
        let (mesh, report) = import(TRIANGLE);
        assert!(report.is_success());
        assert_eq!(mesh.position_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_indices(mesh.face(0)), &[0, 1, 2]);
        assert_eq!(report.lines, 4);
        assert_eq!(report.normals, 1);
        assert_eq!(mesh.face(0).normal, Some(0));
    }

    #[test]
    fn test_negative_indices_count_from_end() {
        let (mesh, _) = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -1 -2 -3\n");
        let indices = mesh.face_indices(mesh.face(0));
        assert_eq!(indices, &[2, 1, 0]);

        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, [0, 1, 2]);
    }

    #[test]
    fn test_two_index_face_is_rolled_back() {
        let (mesh, report) = import("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\n");
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.index_count(), 0);
        assert_eq!(report.rejected_faces, 1);

        let (mesh, _) = import(&format!("{TRIANGLE}f 1 2\nf 3 2 1\n"));
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.face(1).first, 3);
    }

    #[test]
    fn test_coplanar_faces_share_one_normal() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3\nf 1 3 4\n";
        let (mesh, report) = import(text);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.normal_count(), 1);
        assert_eq!(report.normals, 1);
    }

    #[test]
    fn test_unusable_indices_are_dropped() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 0 x 2 9 3\nf 1/5/2 2//1 4\n";
        let (mesh, report) = import(text);
        assert_eq!(report.faces, 2);
        assert_eq!(mesh.face_indices(mesh.face(0)), &[0, 1, 2]);
        assert_eq!(mesh.face_indices(mesh.face(1)), &[0, 1, 3]);
    }

    #[test]
    fn test_ignored_and_unknown_records() {
        let text = "# comment\no thing\nvn 0 0 1\nl 1 2\nusemtl red\n\n   \nv 1 2 3\n";
        let (mesh, report) = import(text);
        assert_eq!(mesh.position_count(), 1);
        assert_eq!(report.lines, 8);
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_malformed_vertex_is_skipped() {
        let (mesh, report) = import("v 1 2\nv a b c\nv 1.5 -2e1 .25 extra\n");
        assert_eq!(mesh.position_count(), 1);
        assert_eq!(*mesh.position(0), Vec3::new(1.5, -20.0, 0.25));
        assert_eq!(report.skipped_lines, 2);
    }

    #[test]
    fn test_empty_stream_is_not_a_success() {
        let (mesh, report) = import("");
        assert!(!report.is_success());
        assert_eq!(mesh.face_count(), 0);

        let (_, report) = import("f 1 2 3\n");
        assert!(!report.is_success());
        assert_eq!(report.rejected_faces, 1);
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let (mesh, _) = import("v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nf 1 2 3");
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_indices(mesh.face(0)), &[0, 1, 2]);
    }

    #[test]
    fn test_yields_on_interval() {
        let mut mesh = IndexedMesh::new();
        let options = ImportOptions {
            yield_interval: Duration::ZERO,
        };
        let mut calls = 0;
        let report = import_obj(&mut mesh, TRIANGLE.as_bytes(), &options, || calls += 1);
        assert_eq!(report.yields, 4);
        assert_eq!(calls, 4);

        let mut mesh = IndexedMesh::new();
        let options = ImportOptions {
            yield_interval: Duration::from_secs(3600),
        };
        let report = import_obj(&mut mesh, TRIANGLE.as_bytes(), &options, NoYield);
        assert_eq!(report.yields, 0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut mesh = IndexedMesh::new();
        let result = import_obj_file(&mut mesh, "/nonexistent/model.obj", &ImportOptions::default(), ThreadYield);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(1, 3), Some(0));
        assert_eq!(resolve_index(3, 3), Some(2));
        assert_eq!(resolve_index(4, 3), None);
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(-4, 3), None);
        assert_eq!(resolve_index(0, 3), None);
    }
}
