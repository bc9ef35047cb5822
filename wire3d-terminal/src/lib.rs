/// Terminal wireframe viewer for bouncing model instances
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::io::{stdout, Write};
use std::time::{Duration, Instant};
use wire3d_core::frustum::Frustum;
use wire3d_core::import::ImportOptions;
use wire3d_core::transform::{Quat, Transform, Vec3};
use wire3d_core::{Camera, IndexedMesh, Result, ScenePool, ViewerConfig, WireMesh};

pub mod models;
pub mod renderer;

pub use models::ModelCatalog;
pub use renderer::WireRenderer;

/// Fraction of the view height a model fills at the focus point
const FILL_FACTOR: f32 = 0.5;
/// Longest simulated step; longer frames (a stall, a slow import) are cut
const MAX_DT: f32 = 0.1;
/// Rows taken by the status line
const STATUS_ROWS: u16 = 1;

/// Main application struct for terminal wireframe rendering
pub struct TerminalApp {
    config: ViewerConfig,
    import_options: ImportOptions,
    catalog: ModelCatalog,
    mesh: IndexedMesh,
    model_name: String,
    grid: Option<WireMesh>,
    scene: ScenePool,
    camera: Camera,
    frustum: Frustum,
    renderer: WireRenderer,
    rng: StdRng,
    running: bool,
    last_tick: Instant,
    last_fps: Instant,
    frame_count: u32,
    fps: f32,
    bounces: usize,
}

impl TerminalApp {
    pub fn new(config: ViewerConfig, catalog: ModelCatalog) -> Result<Self> {
        let (width, height) = terminal::size()?;
        let height = height.saturating_sub(STATUS_ROWS);

        let camera = Camera::new(&config.camera, width as u32, height as u32, config.render.cell_aspect);
        let frustum = camera.frustum()?;
        let scene = ScenePool::new(
            config.scene.max_instances.max(1),
            config.scene.initial_instances,
            config.scene.motion_limits(),
        );
        let grid = config.render.show_grid.then(|| {
            let mut grid = WireMesh::new();
            grid.grid(-3.0, 3.0, 12, -3.0, 3.0, 12);
            grid
        });

        let mut app = Self {
            import_options: config.import.options(),
            config,
            catalog,
            mesh: IndexedMesh::new(),
            model_name: String::new(),
            grid,
            scene,
            camera,
            frustum,
            renderer: WireRenderer::new(width as usize, height as usize),
            rng: StdRng::from_entropy(),
            running: true,
            last_tick: Instant::now(),
            last_fps: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            bounces: 0,
        };
        app.next_model();
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let fps = self.config.render.target_fps.max(1);
        let target_frame_time = Duration::from_secs(1) / fps;
        self.last_tick = Instant::now();

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            self.update();
            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_fps).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps).as_secs_f32();
                self.frame_count = 0;
                self.last_fps = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char('n') => {
                    self.next_model();
                }
                KeyCode::Char(' ') => {
                    let active = self.scene.cycle_active_count();
                    info!("{} active instances", active);
                    self.reset_scene();
                }
                KeyCode::Char('r') => {
                    self.reset_scene();
                }
                _ => {}
            },
            Event::Resize(width, height) => self.resize(width, height.saturating_sub(STATUS_ROWS)),
            _ => {}
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.camera.resize(width as u32, height as u32);
        self.renderer.resize(width as usize, height as usize);
        match self.camera.frustum() {
            Ok(frustum) => self.frustum = frustum,
            Err(e) => warn!("keeping previous frustum: {}", e),
        }
    }

    /// Loads the next model, fits it to the view and restarts the scene
    fn next_model(&mut self) {
        self.model_name = self.catalog.load_next(&mut self.mesh, &self.import_options);
        let radius = match self.camera.fit_mesh_to_view(&mut self.mesh, FILL_FACTOR) {
            Some(radius) => radius,
            None => {
                warn!("{} has no extent", self.model_name);
                1.0
            }
        };
        info!(
            "showing {} ({} vertices, {} faces)",
            self.model_name,
            self.mesh.position_count(),
            self.mesh.face_count()
        );
        self.scene.reset(&mut self.rng, &self.camera.focus, radius);
        self.last_tick = Instant::now();
    }

    fn reset_scene(&mut self) {
        let radius = self.scene.active().first().map_or(1.0, |obj| obj.radius);
        self.scene.reset(&mut self.rng, &self.camera.focus, radius);
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_tick).as_secs_f32().min(MAX_DT);
        self.last_tick = now;

        let reflected = self.scene.tick(dt, &self.frustum);
        if reflected > 0 {
            debug!("{} reflections", reflected);
            self.bounces += reflected;
        }
    }

    fn render(&mut self) -> Result<()> {
        self.renderer.clear();

        if let Some(grid) = &self.grid {
            let floor = Vec3::new(self.camera.focus.x, self.camera.focus.y - 2.0, self.camera.focus.z);
            let model = Transform::from_rotation_translation(&Quat::identity(), &floor);
            self.renderer.render_wire(grid, &model, &self.camera, Color::DarkGrey);
        }

        for i in 0..self.scene.active_count() {
            let [r, g, b] = self.scene.active()[i].color;
            let model = self.scene.instance_matrix(i);
            self.renderer
                .render_mesh(&self.mesh, &model, &self.camera, Color::Rgb { r, g, b });
        }

        let mut stdout = stdout();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "wire3d | {} | {} instances | bounces {} | FPS: {:.1} | n=Next Space=Count R=Reset Q=Quit",
                self.model_name,
                self.scene.active_count(),
                self.bounces,
                self.fps
            )),
            ResetColor,
            cursor::MoveTo(0, STATUS_ROWS),
        )?;
        self.renderer.draw(&mut stdout)?;

        stdout.flush()?;
        Ok(())
    }
}
