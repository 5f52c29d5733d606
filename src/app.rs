//! Application shell
//!
//! Wires the winit event loop to the viewer registry: tabs become windows,
//! window events are routed to the one instance that owns the window, and
//! every redraw drives that instance's poll/tick/render cycle.

use std::collections::HashMap;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{WindowAttributes, WindowId},
};

use crate::assets::{MeshSource, ObjMeshSource};
use crate::catalog::PartCatalog;
use crate::gfx::RenderEngine;
use crate::ui::UiManager;
use crate::viewer::{Command, ViewerRegistry};

/// Initial window size for new tabs
const DEFAULT_WINDOW_SIZE: (u32, u32) = (1200, 800);

/// One configured viewer tab: identity, window title, and its catalog
pub struct TabConfig {
    pub id: String,
    pub title: String,
    pub catalog: PartCatalog,
}

/// The Gasket application
///
/// Owns the event loop and the application state. Configure tabs with
/// [`GasketApp::add_tab`], then hand control to [`GasketApp::run`].
///
/// Keys: digits 1-9 open the corresponding tab, Space toggles
/// assemble/explode for the focused tab, A/E force a direction, Escape
/// quits.
pub struct GasketApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    registry: ViewerRegistry,
    tabs: Vec<TabConfig>,
    source: Arc<dyn MeshSource>,
    windows: HashMap<WindowId, String>,
    focused_tab: Option<String>,
}

impl GasketApp {
    /// Creates an application with no tabs, loading OBJ assets relative to
    /// the working directory.
    pub fn new() -> Self {
        let _ = env_logger::try_init();

        let event_loop = EventLoop::new().expect("Failed to create event loop");

        Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                registry: ViewerRegistry::new(),
                tabs: Vec::new(),
                source: Arc::new(ObjMeshSource::new(".")),
                windows: HashMap::new(),
                focused_tab: None,
            },
        }
    }

    /// The demo configuration: two independent tabs viewing the flange
    /// coupling assembly.
    pub fn demo() -> Self {
        let mut app = Self::new();
        app.add_tab("tab1", "Flange Coupling", PartCatalog::flange_demo());
        app.add_tab("tab2", "Flange Coupling (2)", PartCatalog::flange_demo());
        app
    }

    /// Registers a viewer tab. The first tab opens on startup; the rest
    /// open on their digit key.
    pub fn add_tab(&mut self, id: &str, title: &str, catalog: PartCatalog) {
        self.app_state.tabs.push(TabConfig {
            id: id.to_string(),
            title: title.to_string(),
            catalog,
        });
    }

    /// Replaces the mesh source used for all asset loads.
    pub fn set_mesh_source(&mut self, source: Arc<dyn MeshSource>) {
        self.app_state.source = source;
    }

    /// Runs the application (consumes self and starts the event loop).
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state)?;
        Ok(())
    }
}

impl Default for GasketApp {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Opens (or re-focuses) the tab at `index`.
    ///
    /// Activation is lazy: the instance and its asset loads start here on
    /// first use, and the registry makes repeated opens a no-op.
    fn open_tab(&mut self, index: usize, event_loop: &ActiveEventLoop) {
        let Some(tab) = self.tabs.get(index) else {
            log::debug!("no tab configured at slot {index}");
            return;
        };
        let tab_id = tab.id.clone();

        self.registry.activate(
            &tab_id,
            &tab.catalog,
            Arc::clone(&self.source),
            DEFAULT_WINDOW_SIZE,
        );

        let Some(instance) = self.registry.get_mut(&tab_id) else {
            return;
        };

        if instance.has_gfx() {
            if let Some(window) = instance.window() {
                window.focus_window();
            }
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(tab.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                DEFAULT_WINDOW_SIZE.0,
                DEFAULT_WINDOW_SIZE.1,
            ));

        match event_loop.create_window(attributes) {
            Ok(window) => {
                let window = Arc::new(window);
                let (width, height) = window.inner_size().into();

                let window_clone = window.clone();
                let engine = pollster::block_on(async move {
                    RenderEngine::new(window_clone, width, height).await
                });

                let mut ui = UiManager::new(
                    engine.device(),
                    engine.queue(),
                    engine.surface_format(),
                    &window,
                );
                ui.update_display_size(width, height);

                self.windows.insert(window.id(), tab_id.clone());
                instance.attach_gfx(window, engine, ui);
                self.focused_tab = Some(tab_id);
            }
            Err(error) => log::error!("could not create window for tab '{tab_id}': {error}"),
        }
    }

    fn tab_for_window(&self, window_id: WindowId) -> Option<String> {
        self.windows.get(&window_id).cloned()
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.windows.is_empty() && !self.tabs.is_empty() {
            self.open_tab(0, event_loop);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(tab_id) = self.tab_for_window(window_id) else {
            return;
        };

        // Track focus before anything can consume the event; device input
        // routing depends on it.
        if matches!(event, WindowEvent::Focused(true)) {
            self.focused_tab = Some(tab_id.clone());
        }

        // The overlay sees input first.
        if let Some(instance) = self.registry.get_mut(&tab_id) {
            if instance.handle_window_input(window_id, &event) {
                if let Some(window) = instance.window() {
                    window.request_redraw();
                }
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.registry
                    .dispatch(&tab_id, Command::Resize { width, height });
            }
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if let Some(instance) = self.registry.get_mut(&tab_id) {
                    instance.handle_key_input(&key_event);
                }

                let PhysicalKey::Code(key_code) = key_event.physical_key else {
                    return;
                };
                if key_event.state == ElementState::Pressed {
                    match key_code {
                        KeyCode::Escape => event_loop.exit(),
                        KeyCode::Space => {
                            self.registry.dispatch(&tab_id, Command::ToggleAssembly)
                        }
                        KeyCode::KeyA => self.registry.dispatch(&tab_id, Command::Assemble),
                        KeyCode::KeyE => self.registry.dispatch(&tab_id, Command::Explode),
                        _ => {
                            if let Some(index) = digit_slot(key_code) {
                                self.open_tab(index, event_loop);
                            }
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.registry.frame(&tab_id);
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        // Raw device events carry no window, so they go to the focused tab.
        let Some(tab_id) = self.focused_tab.clone() else {
            return;
        };
        if let Some(instance) = self.registry.get_mut(&tab_id) {
            instance.handle_device_input(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        for instance in self.registry.instances_mut() {
            if let Some(window) = instance.window() {
                window.request_redraw();
            }
        }
    }
}

/// Maps digit keys to tab slots (Digit1 is slot 0).
fn digit_slot(key_code: KeyCode) -> Option<usize> {
    match key_code {
        KeyCode::Digit1 => Some(0),
        KeyCode::Digit2 => Some(1),
        KeyCode::Digit3 => Some(2),
        KeyCode::Digit4 => Some(3),
        KeyCode::Digit5 => Some(4),
        KeyCode::Digit6 => Some(5),
        KeyCode::Digit7 => Some(6),
        KeyCode::Digit8 => Some(7),
        KeyCode::Digit9 => Some(8),
        _ => None,
    }
}
