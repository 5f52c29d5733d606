//! Viewer registry
//!
//! Owns every viewer instance, keyed by tab id, and is the single routing
//! point for activation, commands, and per-frame driving. The registry is a
//! plain value owned by the application shell; there is no global state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::assets::MeshSource;
use crate::catalog::PartCatalog;
use crate::viewer::instance::ViewerInstance;
use crate::viewer::Command;

/// Maps tab ids to their viewer instances
///
/// Activation is guarded so that two rapid activations of the same tab
/// produce exactly one instance and one set of asset loads: the tab is
/// marked as started before any loading begins, and both the mark and the
/// instance map are checked. Instances are never removed; a tab lives for
/// the process lifetime.
#[derive(Default)]
pub struct ViewerRegistry {
    instances: HashMap<String, ViewerInstance>,
    started: HashSet<String>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the tab's instance and starts resolving its catalog.
    ///
    /// Idempotent: a tab that already exists (or whose setup has already
    /// started) is left untouched and `false` is returned.
    pub fn activate(
        &mut self,
        tab_id: &str,
        catalog: &PartCatalog,
        source: Arc<dyn MeshSource>,
        surface_dims: (u32, u32),
    ) -> bool {
        if self.started.contains(tab_id) || self.instances.contains_key(tab_id) {
            log::debug!("tab '{tab_id}' already activating, ignoring");
            return false;
        }

        // Mark before the asset loads spawn so a re-entrant activation
        // cannot race a duplicate instance into existence.
        self.started.insert(tab_id.to_string());

        let instance = ViewerInstance::new(tab_id, catalog, source, surface_dims);
        self.instances.insert(tab_id.to_string(), instance);
        true
    }

    /// Routes a command to the addressed instance only.
    ///
    /// A command for a tab that does not exist yet is logged and dropped;
    /// activation races with early commands degrade to a no-op rather than
    /// a crash.
    pub fn dispatch(&mut self, tab_id: &str, command: Command) {
        match self.instances.get_mut(tab_id) {
            Some(instance) => instance.handle_command(command),
            None => log::warn!("no viewer for tab '{tab_id}', dropping {command:?}"),
        }
    }

    /// Runs one frame for the addressed instance.
    pub fn frame(&mut self, tab_id: &str) {
        if let Some(instance) = self.instances.get_mut(tab_id) {
            instance.frame();
        }
    }

    pub fn get(&self, tab_id: &str) -> Option<&ViewerInstance> {
        self.instances.get(tab_id)
    }

    pub fn get_mut(&mut self, tab_id: &str) -> Option<&mut ViewerInstance> {
        self.instances.get_mut(tab_id)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances_mut(&mut self) -> impl Iterator<Item = &mut ViewerInstance> {
        self.instances.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::StubSource;
    use crate::catalog::PartDefinition;
    use cgmath::Vector3;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    fn catalog(count: usize) -> PartCatalog {
        PartCatalog::new(
            (0..count)
                .map(|i| {
                    PartDefinition::new(
                        &format!("part{i}"),
                        &format!("{i}.obj"),
                        "matMetallic",
                        Vector3::new(0.0, i as f32 * 5.0, 0.0),
                        Vector3::new(0.0, 0.0, 0.0),
                    )
                })
                .collect(),
        )
    }

    fn settle(registry: &mut ViewerRegistry, tab_id: &str) {
        for _ in 0..500 {
            let instance = registry.get_mut(tab_id).unwrap();
            instance.advance(DT);
            if instance.is_ready() || instance.has_failed() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("tab '{tab_id}' never settled");
    }

    #[test]
    fn test_double_activation_spawns_one_instance_and_one_load_set() {
        let mut registry = ViewerRegistry::new();
        let source = Arc::new(StubSource::slow(Duration::from_millis(30)));
        let catalog = catalog(3);

        // Second activation lands while the first tab's loads are in flight.
        assert!(registry.activate("tab1", &catalog, source.clone(), (800, 600)));
        assert!(!registry.activate("tab1", &catalog, source.clone(), (800, 600)));

        assert_eq!(registry.instance_count(), 1);

        settle(&mut registry, "tab1");
        assert_eq!(source.load_calls.load(Ordering::SeqCst), catalog.len());
    }

    #[test]
    fn test_resize_only_touches_the_addressed_tab() {
        let mut registry = ViewerRegistry::new();
        let source: Arc<StubSource> = Arc::new(StubSource::new());
        let catalog = catalog(2);

        registry.activate("tab1", &catalog, source.clone(), (800, 600));
        registry.activate("tab2", &catalog, source, (800, 600));

        registry.dispatch(
            "tab1",
            Command::Resize {
                width: 1920,
                height: 1080,
            },
        );

        let tab1 = registry.get("tab1").unwrap();
        let tab2 = registry.get("tab2").unwrap();
        assert_eq!(tab1.surface_dims(), (1920, 1080));
        assert_eq!(tab2.surface_dims(), (800, 600));
        assert_eq!(tab1.scene.camera_manager.camera.aspect, 1920.0 / 1080.0);
        assert_eq!(tab2.scene.camera_manager.camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn test_dispatch_to_missing_tab_is_a_noop() {
        let mut registry = ViewerRegistry::new();
        registry.dispatch("ghost", Command::Assemble);
        registry.frame("ghost");
        assert_eq!(registry.instance_count(), 0);
    }

    #[test]
    fn test_tabs_settle_independently() {
        let mut registry = ViewerRegistry::new();
        let catalog = catalog(2);

        registry.activate("ok", &catalog, Arc::new(StubSource::new()), (800, 600));
        registry.activate(
            "broken",
            &catalog,
            Arc::new(StubSource::failing_on("1.obj")),
            (800, 600),
        );

        settle(&mut registry, "ok");
        settle(&mut registry, "broken");

        assert!(registry.get("ok").unwrap().is_ready());
        assert!(registry.get("broken").unwrap().has_failed());
        assert_eq!(registry.get("ok").unwrap().scene.part_count(), 2);
        assert_eq!(registry.get("broken").unwrap().scene.part_count(), 0);
    }
}
