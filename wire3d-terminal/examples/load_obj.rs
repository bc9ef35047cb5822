/// Example: Import an OBJ file, report what was read, then view it
///
/// Usage: cargo run --example load_obj -- path/to/model.obj
use std::env;
use std::path::PathBuf;
use wire3d_core::import::{import_obj_file, ImportOptions, NoYield};
use wire3d_core::{IndexedMesh, Result, ViewerConfig};
use wire3d_terminal::{ModelCatalog, TerminalApp};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: {} <obj-file>", args[0]);
        eprintln!("\nNo OBJ file provided, showing placeholders...");
        return TerminalApp::new(ViewerConfig::default(), ModelCatalog::default())?.run();
    };

    let mut mesh = IndexedMesh::new();
    let report = import_obj_file(&mut mesh, &path, &ImportOptions::default(), NoYield)?;
    println!("Loaded {}", path.display());
    println!("  {:?}", report);
    println!("  extents {:?}", mesh.compute_extents());
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(ViewerConfig::default(), ModelCatalog::new(vec![path]))?;
    app.run()
}
