//! Asset resolution for part catalogs
//!
//! Turns a declarative catalog into loaded, positioned parts. Every
//! definition gets its own load request against the mesh source; requests
//! run concurrently on worker threads and the aggregate result is polled
//! from the frame loop, which must never block. The aggregation is
//! all-or-nothing: the first failed load fails the whole catalog, and any
//! still-running loads simply finish into the void.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::catalog::{PartCatalog, PartDefinition};
use crate::gfx::material::MaterialLibrary;
use crate::gfx::renderable::{Mesh, MeshData, Renderable};
use crate::part::Part;

/// Failure reported by a mesh source for a single asset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not load OBJ file: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("{0}")]
    Other(String),
}

/// A part asset that failed to load, with the offending asset reference
///
/// Raised by the resolver and recovered at the viewer-instance boundary:
/// the instance transitions to its load-failed state and the process keeps
/// running with that tab surface-only.
#[derive(Debug, Error)]
#[error("failed to load part asset '{asset_ref}'")]
pub struct AssetError {
    pub asset_ref: String,
    #[source]
    pub cause: LoadError,
}

/// External mesh-loading collaborator
///
/// Asset references are opaque strings passed straight through. The call is
/// blocking; the resolver runs it on a worker thread per asset.
pub trait MeshSource: Send + Sync {
    fn load(&self, asset_ref: &str) -> Result<Vec<MeshData>, LoadError>;
}

/// Loads OBJ files from disk relative to a base directory
pub struct ObjMeshSource {
    base_dir: PathBuf,
}

impl ObjMeshSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl MeshSource for ObjMeshSource {
    fn load(&self, asset_ref: &str) -> Result<Vec<MeshData>, LoadError> {
        let path = self.base_dir.join(asset_ref);
        let (models, _materials) = tobj::load_obj(
            &path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        Ok(models
            .into_iter()
            .map(|model| MeshData {
                name: model.name,
                positions: model.mesh.positions,
                normals: model.mesh.normals,
                indices: model.mesh.indices,
            })
            .collect())
    }
}

/// Aggregate progress of one catalog's load set
pub enum LoadProgress {
    /// Loads still in flight; counts drive the progress readout
    Pending { loaded: usize, total: usize },
    /// Every load succeeded; parts are in catalog order
    Ready(Vec<Part>),
    /// At least one load failed
    Failed(AssetError),
}

/// In-flight load set for one catalog
///
/// Holds the receiving end of the worker results plus the slots being
/// filled. Completed renderables are wrapped into parts as they arrive so
/// the final `Ready` is just a hand-over.
pub struct PendingParts {
    rx: Receiver<(usize, PartDefinition, Result<Vec<MeshData>, AssetError>)>,
    slots: Vec<Option<Part>>,
    loaded: usize,
    total: usize,
}

/// Issues one concurrent load per catalog entry and returns the aggregate.
///
/// All requests start immediately with no throttling. The returned set must
/// be polled (see [`PendingParts::poll`]) until it reports ready or failed.
pub fn resolve_all(catalog: &PartCatalog, source: Arc<dyn MeshSource>) -> PendingParts {
    let total = catalog.len();
    let (tx, rx) = mpsc::channel();

    for (index, def) in catalog.definitions.iter().cloned().enumerate() {
        let tx = tx.clone();
        let source = Arc::clone(&source);
        thread::spawn(move || {
            log::trace!("loading part asset '{}'", def.asset_ref);
            let result = source.load(&def.asset_ref).map_err(|cause| AssetError {
                asset_ref: def.asset_ref.clone(),
                cause,
            });
            // The receiver may already be gone after a fail-fast abort.
            let _ = tx.send((index, def, result));
        });
    }

    PendingParts {
        rx,
        slots: (0..total).map(|_| None).collect(),
        loaded: 0,
        total,
    }
}

impl PendingParts {
    /// Drains any results that arrived since the last frame.
    ///
    /// Never blocks. Returns `Failed` as soon as any single load has
    /// failed; results from the remaining workers are discarded unread.
    pub fn poll(&mut self, materials: &MaterialLibrary) -> LoadProgress {
        loop {
            match self.rx.try_recv() {
                Ok((index, def, Ok(meshes))) => {
                    self.slots[index] = Some(build_part(&def, meshes, materials));
                    self.loaded += 1;
                }
                Ok((_, _, Err(error))) => {
                    log::error!("{error}");
                    return LoadProgress::Failed(error);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.loaded < self.total {
                        // A worker died without reporting. Treat it like a
                        // failed load so the viewer can surface something.
                        return LoadProgress::Failed(AssetError {
                            asset_ref: self.missing_asset_ref(),
                            cause: LoadError::Other("asset loader thread terminated".into()),
                        });
                    }
                    break;
                }
            }
        }

        if self.loaded == self.total {
            let parts = self.slots.drain(..).map(|slot| slot.unwrap()).collect();
            LoadProgress::Ready(parts)
        } else {
            LoadProgress::Pending {
                loaded: self.loaded,
                total: self.total,
            }
        }
    }

    fn missing_asset_ref(&self) -> String {
        self.slots
            .iter()
            .position(|slot| slot.is_none())
            .map(|index| format!("catalog entry {index}"))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Assembles a loaded mesh set into a positioned part.
///
/// Material selection happens here: the catalog key is resolved against the
/// library (unknown keys fall back to the default material) and stamped on
/// every mesh sub-node of the renderable.
fn build_part(def: &PartDefinition, meshes: Vec<MeshData>, materials: &MaterialLibrary) -> Part {
    let meshes = meshes.into_iter().map(Mesh::from_data).collect();
    let mut renderable = Renderable::new(&def.id, meshes);

    let material_id = materials.resolve_key(&def.material_key);
    renderable.visit_meshes(|mesh| mesh.material_id = Some(material_id.clone()));

    Part::new(&def.id, renderable, def.start_pos, def.end_pos)
}

/// Test doubles shared by the asset and viewer test suites.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mesh source serving canned results, counting every load request.
    pub(crate) struct StubSource {
        pub failing: HashSet<String>,
        pub load_calls: AtomicUsize,
        pub delay: Duration,
    }

    impl StubSource {
        pub fn new() -> Self {
            Self {
                failing: HashSet::new(),
                load_calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        pub fn failing_on(asset_ref: &str) -> Self {
            let mut source = Self::new();
            source.failing.insert(asset_ref.to_string());
            source
        }

        pub fn slow(delay: Duration) -> Self {
            let mut source = Self::new();
            source.delay = delay;
            source
        }
    }

    impl MeshSource for StubSource {
        fn load(&self, asset_ref: &str) -> Result<Vec<MeshData>, LoadError> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            if self.failing.contains(asset_ref) {
                return Err(LoadError::Other(format!("no such asset: {asset_ref}")));
            }
            Ok(vec![MeshData {
                name: asset_ref.to_string(),
                positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                indices: vec![0, 1, 2],
            }])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubSource;
    use super::*;
    use cgmath::Vector3;
    use std::time::Duration;

    fn catalog_of(refs: &[&str]) -> PartCatalog {
        PartCatalog::new(
            refs.iter()
                .enumerate()
                .map(|(i, asset_ref)| {
                    crate::catalog::PartDefinition::new(
                        &format!("part{i}"),
                        asset_ref,
                        "matYellow",
                        Vector3::new(0.0, 5.0 * i as f32, 0.0),
                        Vector3::new(0.0, 0.0, 0.0),
                    )
                })
                .collect(),
        )
    }

    fn poll_to_completion(pending: &mut PendingParts, materials: &MaterialLibrary) -> LoadProgress {
        for _ in 0..500 {
            match pending.poll(materials) {
                LoadProgress::Pending { .. } => thread::sleep(Duration::from_millis(2)),
                done => return done,
            }
        }
        panic!("load set never completed");
    }

    #[test]
    fn test_resolve_all_populates_parts_in_catalog_order() {
        let materials = MaterialLibrary::new();
        let catalog = catalog_of(&["a.obj", "b.obj", "c.obj"]);
        let mut pending = resolve_all(&catalog, Arc::new(StubSource::new()));

        match poll_to_completion(&mut pending, &materials) {
            LoadProgress::Ready(parts) => {
                assert_eq!(parts.len(), 3);
                for (i, part) in parts.iter().enumerate() {
                    assert_eq!(part.id, format!("part{i}"));
                    assert_eq!(part.current_pos, part.start_pos);
                    assert!(part.target.is_none());
                }
            }
            _ => panic!("expected all loads to succeed"),
        }
    }

    #[test]
    fn test_one_failed_load_fails_the_whole_catalog() {
        let materials = MaterialLibrary::new();
        let catalog = catalog_of(&["a.obj", "missing.obj", "c.obj"]);
        let mut pending = resolve_all(&catalog, Arc::new(StubSource::failing_on("missing.obj")));

        match poll_to_completion(&mut pending, &materials) {
            LoadProgress::Failed(error) => assert_eq!(error.asset_ref, "missing.obj"),
            _ => panic!("expected the aggregate to fail"),
        }
    }

    #[test]
    fn test_unknown_material_key_falls_back_to_default() {
        let materials = MaterialLibrary::new();
        let mut catalog = catalog_of(&["a.obj"]);
        catalog.definitions[0].material_key = "matDoesNotExist".to_string();
        let mut pending = resolve_all(&catalog, Arc::new(StubSource::new()));

        match poll_to_completion(&mut pending, &materials) {
            LoadProgress::Ready(parts) => {
                for mesh in &parts[0].renderable.meshes {
                    assert_eq!(mesh.material_id.as_deref(), Some(MaterialLibrary::DEFAULT_ID));
                }
            }
            _ => panic!("expected the load to succeed"),
        }
    }

    #[test]
    fn test_known_material_key_is_stamped_on_every_mesh() {
        let materials = MaterialLibrary::new();
        let catalog = catalog_of(&["a.obj"]);
        let mut pending = resolve_all(&catalog, Arc::new(StubSource::new()));

        match poll_to_completion(&mut pending, &materials) {
            LoadProgress::Ready(parts) => {
                for mesh in &parts[0].renderable.meshes {
                    assert_eq!(mesh.material_id.as_deref(), Some("matYellow"));
                }
            }
            _ => panic!("expected the load to succeed"),
        }
    }

    #[test]
    fn test_empty_catalog_resolves_immediately() {
        let materials = MaterialLibrary::new();
        let catalog = PartCatalog::default();
        let mut pending = resolve_all(&catalog, Arc::new(StubSource::new()));

        match pending.poll(&materials) {
            LoadProgress::Ready(parts) => assert!(parts.is_empty()),
            _ => panic!("empty catalog should resolve without polling"),
        }
    }
}
