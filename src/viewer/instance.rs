//! A single viewer instance
//!
//! Owns one tab's scene, camera, parts, and (once a window exists) its
//! render surface and UI overlay. The instance is a small state machine:
//! it starts loading its catalog on creation, becomes ready when every
//! asset resolves, or parks itself in a failed state that keeps the
//! surface alive without parts.

use std::sync::Arc;
use std::time::Instant;

use winit::event::{DeviceEvent, KeyEvent, WindowEvent};
use winit::window::{Window, WindowId};

use crate::animation::AnimationDriver;
use crate::assets::{self, LoadProgress, MeshSource, PendingParts};
use crate::catalog::PartCatalog;
use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
use crate::gfx::{RenderEngine, Scene};
use crate::ui::UiManager;
use crate::viewer::Command;

/// Derived layout state of an instance's parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Exploded,
    Transitioning,
    Assembled,
}

/// Lifecycle of an instance's asset set
enum ViewerState {
    /// Loads in flight; polled every frame
    Loading(PendingParts),
    /// All parts resolved and installed in the scene
    Ready,
    /// At least one load failed; the message is shown in the overlay
    LoadFailed(String),
}

/// Window-bound resources, attached once the tab's window exists
pub struct InstanceGfx {
    pub window: Arc<Window>,
    pub engine: RenderEngine,
    pub ui: UiManager,
}

/// Overlay interactions collected during a frame
#[derive(Default)]
struct UiActions {
    toggle_clicked: bool,
    select: Option<Option<usize>>,
}

/// One independent viewer tab
pub struct ViewerInstance {
    pub tab_id: String,
    pub scene: Scene,
    state: ViewerState,
    driver: AnimationDriver,
    surface_dims: (u32, u32),
    /// Index of the highlighted part, if any
    pub selection: Option<usize>,
    /// Destination the last assembly command aimed for
    assembled_goal: bool,
    load_progress: (usize, usize),
    last_frame: Instant,
    gfx: Option<InstanceGfx>,
}

impl ViewerInstance {
    /// Creates the instance and immediately starts resolving its catalog.
    ///
    /// The scene and camera exist from this point on; GPU resources follow
    /// later via [`ViewerInstance::attach_gfx`].
    pub fn new(
        tab_id: &str,
        catalog: &PartCatalog,
        source: Arc<dyn MeshSource>,
        surface_dims: (u32, u32),
    ) -> Self {
        let aspect = surface_dims.0 as f32 / surface_dims.1.max(1) as f32;
        let camera = OrbitCamera::framing_assembly(aspect);
        let controller = CameraController::new(0.005, 0.1);
        let scene = Scene::new(CameraManager::new(camera, controller));

        log::info!(
            "viewer '{tab_id}': loading {} part assets",
            catalog.len()
        );
        let pending = assets::resolve_all(catalog, source);
        let total = catalog.len();

        Self {
            tab_id: tab_id.to_string(),
            scene,
            state: ViewerState::Loading(pending),
            driver: AnimationDriver::new(),
            surface_dims,
            selection: None,
            assembled_goal: false,
            load_progress: (0, total),
            last_frame: Instant::now(),
            gfx: None,
        }
    }

    /// Attaches the window-bound rendering resources.
    ///
    /// Parts that resolved before the window existed get their GPU buffers
    /// uploaded here.
    pub fn attach_gfx(&mut self, window: Arc<Window>, engine: RenderEngine, ui: UiManager) {
        self.surface_dims = engine.surface_size();
        self.scene
            .camera_manager
            .camera
            .resize_projection(self.surface_dims.0, self.surface_dims.1);

        self.gfx = Some(InstanceGfx { window, engine, ui });

        if matches!(self.state, ViewerState::Ready) {
            let gfx = self.gfx.as_mut().unwrap();
            self.scene
                .init_gpu_resources(gfx.engine.device(), gfx.engine.queue());
        }
    }

    pub fn has_gfx(&self) -> bool {
        self.gfx.is_some()
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.gfx.as_ref().map(|gfx| &gfx.window)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ViewerState::Ready)
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.state, ViewerState::LoadFailed(_))
    }

    pub fn surface_dims(&self) -> (u32, u32) {
        self.surface_dims
    }

    /// Derived layout state: transitioning while any part still has a
    /// target, otherwise assembled only when every part rests at its
    /// assembled anchor.
    pub fn assembly_state(&self) -> AssemblyState {
        if self.scene.parts.iter().any(|part| part.is_animating()) {
            AssemblyState::Transitioning
        } else if !self.scene.parts.is_empty()
            && self.scene.parts.iter().all(|part| part.is_assembled())
        {
            AssemblyState::Assembled
        } else {
            AssemblyState::Exploded
        }
    }

    /// Applies a command to this instance only.
    ///
    /// Assembly and selection commands are ignored (at debug level) until
    /// the instance is ready; resize always applies since camera and
    /// surface exist from creation.
    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Resize { width, height } => self.resize(width, height),
            _ if !self.is_ready() => {
                log::debug!(
                    "viewer '{}': ignoring {command:?} before assets are ready",
                    self.tab_id
                );
            }
            Command::Assemble => self.assemble(),
            Command::Explode => self.explode(),
            Command::ToggleAssembly => self.toggle_assembly(),
            Command::Select(index) => self.select(index),
        }
    }

    pub fn assemble(&mut self) {
        self.assembled_goal = true;
        self.driver.request_assemble(&mut self.scene.parts);
    }

    pub fn explode(&mut self) {
        self.assembled_goal = false;
        self.driver.request_explode(&mut self.scene.parts);
    }

    /// The overlay button's semantics: flip the destination, even
    /// mid-flight (targets are simply overwritten).
    pub fn toggle_assembly(&mut self) {
        if self.assembled_goal {
            self.explode();
        } else {
            self.assemble();
        }
    }

    pub fn select(&mut self, index: Option<usize>) {
        match index {
            Some(i) if i >= self.scene.parts.len() => {
                log::debug!("viewer '{}': selection {i} out of range", self.tab_id);
            }
            _ => self.selection = index,
        }
    }

    /// Recomputes camera aspect and surface dimensions for this instance.
    fn resize(&mut self, width: u32, height: u32) {
        self.surface_dims = (width, height);
        self.scene
            .camera_manager
            .camera
            .resize_projection(width, height);

        if let Some(gfx) = self.gfx.as_mut() {
            gfx.engine.resize(width, height);
            gfx.ui.update_display_size(width, height);
        }
    }

    /// Drains asset-load results without blocking.
    ///
    /// Ready parts are installed in the scene (and uploaded if a device is
    /// already attached); a failure parks the instance in `LoadFailed`
    /// with the parts list left empty.
    pub fn poll_assets(&mut self) {
        let ViewerState::Loading(pending) = &mut self.state else {
            return;
        };

        match pending.poll(&self.scene.materials) {
            LoadProgress::Pending { loaded, total } => {
                self.load_progress = (loaded, total);
            }
            LoadProgress::Ready(parts) => {
                self.load_progress = (parts.len(), parts.len());
                log::info!("viewer '{}': {} parts ready", self.tab_id, parts.len());
                self.scene.set_parts(parts);
                if let Some(gfx) = self.gfx.as_mut() {
                    self.scene
                        .init_gpu_resources(gfx.engine.device(), gfx.engine.queue());
                }
                self.state = ViewerState::Ready;
            }
            LoadProgress::Failed(error) => {
                log::warn!(
                    "viewer '{}': assets unavailable, tab stays empty",
                    self.tab_id
                );
                self.state = ViewerState::LoadFailed(error.to_string());
            }
        }
    }

    /// Advances the instance by `dt` seconds: asset polling plus the
    /// animation tick. Safe to call in any state and without a window.
    pub fn advance(&mut self, dt: f32) {
        self.poll_assets();
        self.driver
            .tick(&mut self.scene.parts, &mut self.scene.group_angle, dt);
    }

    /// Runs one full frame: advance by wall-clock time, then render.
    pub fn frame(&mut self) {
        let now = Instant::now();
        // Clamp away pauses (window drags, debugger stops) so parts do not
        // teleport on the next frame.
        let dt = (now - self.last_frame).as_secs_f32().min(0.25);
        self.last_frame = now;

        self.advance(dt);
        self.render();
    }

    /// Renders the scene and overlay, then applies overlay interactions.
    fn render(&mut self) {
        if self.gfx.is_none() {
            return;
        }

        self.scene.update();

        let snapshot = OverlaySnapshot {
            tab_id: self.tab_id.clone(),
            status: match &self.state {
                ViewerState::Loading(_) => OverlayStatus::Loading {
                    loaded: self.load_progress.0,
                    total: self.load_progress.1,
                },
                ViewerState::Ready => OverlayStatus::Ready,
                ViewerState::LoadFailed(message) => OverlayStatus::Failed(message.clone()),
            },
            assembled_goal: self.assembled_goal,
            assembly_state: self.assembly_state(),
            part_labels: self.scene.parts.iter().map(|p| p.id.clone()).collect(),
            selection: self.selection,
        };

        let mut actions = UiActions::default();
        {
            let gfx = self.gfx.as_mut().unwrap();
            gfx.engine.update(self.scene.camera_manager.camera.uniform);
            self.scene.sync_transforms(gfx.engine.queue());

            let window = gfx.window.clone();
            let ui = &mut gfx.ui;
            gfx.engine.render_frame(
                &self.scene,
                Some(
                    |device: &wgpu::Device,
                     queue: &wgpu::Queue,
                     encoder: &mut wgpu::CommandEncoder,
                     view: &wgpu::TextureView| {
                        ui.draw(device, queue, encoder, &window, view, |frame_ui| {
                            build_overlay(frame_ui, &snapshot, &mut actions);
                        });
                    },
                ),
            );
        }

        if actions.toggle_clicked {
            self.toggle_assembly();
        }
        if let Some(selection) = actions.select {
            self.select(selection);
        }
    }

    /// Lets the overlay see a window event first; returns true when the UI
    /// captured it.
    pub fn handle_window_input(&mut self, window_id: WindowId, event: &WindowEvent) -> bool {
        let Some(gfx) = self.gfx.as_mut() else {
            return false;
        };
        let wrapped: winit::event::Event<()> = winit::event::Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        gfx.ui.handle_input(&gfx.window, &wrapped)
    }

    /// Routes raw device input to this instance's camera.
    pub fn handle_device_input(&mut self, event: &DeviceEvent) {
        let Some(gfx) = self.gfx.as_ref() else {
            return;
        };
        if gfx.ui.wants_input() {
            return;
        }
        self.scene.camera_manager.process_event(event, &gfx.window);
    }

    /// Routes keyboard input to this instance's camera controller.
    pub fn handle_key_input(&mut self, event: &KeyEvent) {
        let camera_manager = &mut self.scene.camera_manager;
        camera_manager
            .controller
            .process_keyed_events(event, &mut camera_manager.camera);
    }
}

enum OverlayStatus {
    Loading { loaded: usize, total: usize },
    Ready,
    Failed(String),
}

/// Immutable snapshot of the state the overlay renders from, captured
/// before the render pass borrows the scene.
struct OverlaySnapshot {
    tab_id: String,
    status: OverlayStatus,
    assembled_goal: bool,
    assembly_state: AssemblyState,
    part_labels: Vec<String>,
    selection: Option<usize>,
}

/// Builds the per-tab overlay: status line, toggle button, part list.
fn build_overlay(ui: &imgui::Ui, snapshot: &OverlaySnapshot, actions: &mut UiActions) {
    ui.window(format!("Assembly [{}]", snapshot.tab_id))
        .size([280.0, 320.0], imgui::Condition::FirstUseEver)
        .position([16.0, 16.0], imgui::Condition::FirstUseEver)
        .build(|| {
            match &snapshot.status {
                OverlayStatus::Loading { loaded, total } => {
                    ui.text(format!("Loading parts... {loaded}/{total}"));
                    let fraction = if *total == 0 {
                        1.0
                    } else {
                        *loaded as f32 / *total as f32
                    };
                    imgui::ProgressBar::new(fraction).build(ui);
                }
                OverlayStatus::Failed(message) => {
                    ui.text_wrapped(format!("Load failed: {message}"));
                }
                OverlayStatus::Ready => {
                    let label = if snapshot.assembled_goal {
                        "Explode Model"
                    } else {
                        "Assemble Model"
                    };
                    if ui.button(label) {
                        actions.toggle_clicked = true;
                    }

                    ui.same_line();
                    ui.text(match snapshot.assembly_state {
                        AssemblyState::Exploded => "exploded",
                        AssemblyState::Transitioning => "moving...",
                        AssemblyState::Assembled => "assembled",
                    });

                    ui.separator();
                    for (index, label) in snapshot.part_labels.iter().enumerate() {
                        let selected = snapshot.selection == Some(index);
                        if ui
                            .selectable_config(format!("{label}##{index}"))
                            .selected(selected)
                            .build()
                        {
                            // Clicking the highlighted row clears the highlight.
                            actions.select = Some(if selected { None } else { Some(index) });
                        }
                    }
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::StubSource;
    use crate::catalog::PartDefinition;
    use cgmath::Vector3;
    use std::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    fn test_catalog() -> PartCatalog {
        PartCatalog::new(vec![
            PartDefinition::new(
                "a",
                "a.obj",
                "matYellow",
                Vector3::new(0.0, 5.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            ),
            PartDefinition::new(
                "b",
                "b.obj",
                "matBlue",
                Vector3::new(0.0, 10.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            ),
            PartDefinition::new(
                "c",
                "c.obj",
                "matMetallic",
                Vector3::new(0.0, -5.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            ),
        ])
    }

    fn wait_until_settled(instance: &mut ViewerInstance) {
        for _ in 0..500 {
            instance.advance(DT);
            if instance.is_ready() || instance.has_failed() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("instance never left the loading state");
    }

    #[test]
    fn test_instance_becomes_ready_and_assembles() {
        let mut instance = ViewerInstance::new(
            "tab1",
            &test_catalog(),
            Arc::new(StubSource::new()),
            (800, 600),
        );
        wait_until_settled(&mut instance);
        assert!(instance.is_ready());
        assert_eq!(instance.assembly_state(), AssemblyState::Exploded);

        instance.handle_command(Command::Assemble);
        assert_eq!(instance.assembly_state(), AssemblyState::Transitioning);

        for _ in 0..600 {
            instance.advance(DT);
        }

        assert_eq!(instance.assembly_state(), AssemblyState::Assembled);
        for part in &instance.scene.parts {
            assert_eq!(part.current_pos, Vector3::new(0.0, 0.0, 0.0));
            assert!(part.target.is_none());
        }
    }

    #[test]
    fn test_failed_load_leaves_instance_surface_only() {
        let mut instance = ViewerInstance::new(
            "tab1",
            &test_catalog(),
            Arc::new(StubSource::failing_on("b.obj")),
            (800, 600),
        );
        wait_until_settled(&mut instance);

        assert!(instance.has_failed());
        assert!(instance.scene.parts.is_empty());

        // Subsequent frames and commands must not crash or change state.
        for _ in 0..10 {
            instance.advance(DT);
        }
        instance.handle_command(Command::Assemble);
        assert!(instance.has_failed());
        assert!(instance.scene.parts.is_empty());
    }

    #[test]
    fn test_commands_before_ready_are_ignored() {
        let source = Arc::new(StubSource::slow(Duration::from_millis(100)));
        let mut instance =
            ViewerInstance::new("tab1", &test_catalog(), source, (800, 600));

        instance.handle_command(Command::Assemble);
        wait_until_settled(&mut instance);

        assert!(instance.is_ready());
        assert!(instance.scene.parts.iter().all(|p| p.target.is_none()));
        assert_eq!(instance.assembly_state(), AssemblyState::Exploded);
    }

    #[test]
    fn test_toggle_flips_destination() {
        let mut instance = ViewerInstance::new(
            "tab1",
            &test_catalog(),
            Arc::new(StubSource::new()),
            (800, 600),
        );
        wait_until_settled(&mut instance);

        instance.handle_command(Command::ToggleAssembly);
        for part in &instance.scene.parts {
            assert_eq!(part.target, Some(part.end_pos));
        }

        // Toggling again mid-flight redirects back toward exploded.
        instance.advance(DT);
        instance.handle_command(Command::ToggleAssembly);
        for part in &instance.scene.parts {
            assert_eq!(part.target, Some(part.start_pos));
        }
    }

    #[test]
    fn test_selection_bounds_are_checked() {
        let mut instance = ViewerInstance::new(
            "tab1",
            &test_catalog(),
            Arc::new(StubSource::new()),
            (800, 600),
        );
        wait_until_settled(&mut instance);

        instance.handle_command(Command::Select(Some(1)));
        assert_eq!(instance.selection, Some(1));

        instance.handle_command(Command::Select(Some(99)));
        assert_eq!(instance.selection, Some(1));

        instance.handle_command(Command::Select(None));
        assert_eq!(instance.selection, None);
    }

    #[test]
    fn test_resize_applies_while_loading() {
        let source = Arc::new(StubSource::slow(Duration::from_millis(50)));
        let mut instance =
            ViewerInstance::new("tab1", &test_catalog(), source, (800, 600));

        instance.handle_command(Command::Resize {
            width: 1600,
            height: 800,
        });

        assert_eq!(instance.surface_dims(), (1600, 800));
        assert_eq!(instance.scene.camera_manager.camera.aspect, 2.0);
    }
}
