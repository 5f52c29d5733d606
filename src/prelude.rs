//! # Gasket Prelude
//!
//! Brings the types a typical viewer setup needs into scope:
//!
//! ```no_run
//! use gasket::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut app = gasket::default();
//!     app.add_tab("tab1", "My Assembly", PartCatalog::flange_demo());
//!     app.run()
//! }
//! ```

pub use crate::animation::AnimationDriver;
pub use crate::app::{GasketApp, TabConfig};
pub use crate::assets::{AssetError, LoadError, MeshSource, ObjMeshSource};
pub use crate::catalog::{PartCatalog, PartDefinition};
pub use crate::part::Part;
pub use crate::viewer::{AssemblyState, Command, ViewerInstance, ViewerRegistry};

// Math types commonly used with catalogs
pub use cgmath::Vector3;
