/// Wire3D Terminal Viewer - Bouncing Wireframes
///
/// Usage: wire3d-terminal [MODEL_DIR] [CONFIG.toml]
///
/// Shows every `.obj` model in MODEL_DIR (default: the current directory),
/// falling back to built-in placeholders. Log output goes to stderr; set
/// RUST_LOG and redirect stderr to a file to keep it off the screen.
///
/// Controls:
///   - N: Next model
///   - Space: Cycle the number of instances
///   - R: Re-randomize
///   - Q/ESC: Quit
use std::env;
use wire3d_core::{Result, ViewerConfig};
use wire3d_terminal::{ModelCatalog, TerminalApp};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let model_dir = args.get(1).map(String::as_str).unwrap_or(".");
    let config = match args.get(2) {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let catalog = ModelCatalog::scan(model_dir);
    let mut app = TerminalApp::new(config, catalog)?;
    app.run()
}
