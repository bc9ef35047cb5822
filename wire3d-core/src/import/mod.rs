//! Streaming import of Wavefront OBJ text into an [`IndexedMesh`](crate::mesh::IndexedMesh)
mod obj;
mod tokenizer;

pub use obj::{
    import_obj, import_obj_file, import_obj_str, ImportOptions, ImportReport, NoYield, ObjImporter, ThreadYield, Yield,
};
pub use tokenizer::Tokenizer;
