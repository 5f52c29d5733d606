//! Part catalogs for the Gasket viewer
//!
//! A catalog is the declarative input to one viewer tab: an ordered list of
//! part definitions naming the asset to load, the material to apply, and the
//! exploded/assembled anchor positions.

use cgmath::Vector3;

/// Declarative description of a single part in an assembly
///
/// Authored data, immutable once loaded into a catalog. `id` is a human
/// label for display; catalogs may contain repeated ids (paired parts such
/// as a flange and its o-ring often share one), so parts are addressed by
/// catalog index everywhere that identity matters.
#[derive(Debug, Clone)]
pub struct PartDefinition {
    /// Display label for this part
    pub id: String,
    /// Opaque asset path handed to the mesh source
    pub asset_ref: String,
    /// Key into the material library; unknown keys fall back to the default
    pub material_key: String,
    /// Position in the exploded layout
    pub start_pos: Vector3<f32>,
    /// Position in the assembled layout
    pub end_pos: Vector3<f32>,
}

impl PartDefinition {
    pub fn new(
        id: &str,
        asset_ref: &str,
        material_key: &str,
        start_pos: Vector3<f32>,
        end_pos: Vector3<f32>,
    ) -> Self {
        Self {
            id: id.to_string(),
            asset_ref: asset_ref.to_string(),
            material_key: material_key.to_string(),
            start_pos,
            end_pos,
        }
    }
}

/// Ordered list of part definitions for one viewer tab
///
/// Pure data with no behavior of its own; validation happens when the asset
/// resolver tries to load the referenced meshes.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    pub definitions: Vec<PartDefinition>,
}

impl PartCatalog {
    pub fn new(definitions: Vec<PartDefinition>) -> Self {
        Self { definitions }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The flange-coupling demo assembly
    ///
    /// Eight OBJ parts stacked along the Y axis in the exploded layout, all
    /// collapsing to the origin when assembled. Note the repeated `part1`
    /// and `part4` labels: each flange travels together with its o-ring.
    pub fn flange_demo() -> Self {
        let origin = Vector3::new(0.0, 0.0, 0.0);
        Self::new(vec![
            PartDefinition::new(
                "part1",
                "parts/plug.obj",
                "matYellow",
                Vector3::new(0.0, 12.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part1",
                "parts/plugO.obj",
                "matBlueO",
                Vector3::new(0.0, 12.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part2",
                "parts/nuts.obj",
                "matMetallic",
                Vector3::new(0.0, 13.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part3",
                "parts/topHW.obj",
                "matMetallic",
                Vector3::new(0.0, 2.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part4",
                "parts/maleFlange.obj",
                "matOrange",
                Vector3::new(0.0, 7.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part4",
                "parts/maleFlangeO.obj",
                "matBlueO",
                Vector3::new(0.0, 7.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part5",
                "parts/bottomHW.obj",
                "matMetallic",
                Vector3::new(0.0, -1.0, 0.0),
                origin,
            ),
            PartDefinition::new(
                "part6",
                "parts/femaleFlange.obj",
                "matBlue",
                Vector3::new(0.0, -5.0, 0.0),
                origin,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_preserves_duplicate_ids() {
        let catalog = PartCatalog::flange_demo();
        assert_eq!(catalog.len(), 8);

        let part1_count = catalog
            .definitions
            .iter()
            .filter(|def| def.id == "part1")
            .count();
        assert_eq!(part1_count, 2);
    }

    #[test]
    fn test_demo_catalog_assembles_to_origin() {
        let catalog = PartCatalog::flange_demo();
        for def in &catalog.definitions {
            assert_eq!(def.end_pos, Vector3::new(0.0, 0.0, 0.0));
        }
    }
}
