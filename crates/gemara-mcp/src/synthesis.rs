//! Layer 3 control modifier synthesis.
//!
//! Traces guideline-mapping edges from each control back to the guidance document and emits
//! one modifier for every control with at least one edge that resolves.
use std::collections::HashSet;

use tracing::debug;

use crate::model::{Control, ControlCatalog, ControlModifier, GuidanceDocument, Mapping, ModType};

#[derive(Debug, Clone, Default)]
pub struct ModifierRequest {
    pub rationale: String,
    pub mod_type: ModType,
}

/// Build the harmonization mapping for `catalog` against `guidance`.
///
/// The first resolving reference decides a control; later mappings of the same control are
/// not looked at, so a control never receives more than one modifier. Controls whose
/// references all point outside `guidance` are left out.
pub fn synthesize_control_modifiers(
    guidance: &GuidanceDocument,
    catalog: &ControlCatalog,
    request: &ModifierRequest,
) -> Mapping {
    let guideline_ids: HashSet<&str> = guidance.guidelines().map(|g| g.id.as_str()).collect();

    let control_modifications: Vec<ControlModifier> = catalog
        .controls()
        .filter(|control| references_any(control, &guideline_ids))
        .map(|control| ControlModifier {
            target_id: control.id.clone(),
            mod_type: request.mod_type,
            modification_rationale: request.rationale.clone(),
            title: control.title.clone(),
            objective: control.objective.clone(),
        })
        .collect();

    debug!(
        catalog = %catalog.metadata.id,
        guidance = %guidance.metadata.id,
        emitted = control_modifications.len(),
        unresolved = catalog.controls().count() - control_modifications.len(),
        "control modifiers synthesized"
    );

    Mapping {
        reference_id: catalog.metadata.id.clone(),
        control_modifications,
        ..Default::default()
    }
}

fn references_any(control: &Control, guideline_ids: &HashSet<&str>) -> bool {
    control
        .guideline_mappings
        .iter()
        .flat_map(|mapping| mapping.entries.iter())
        .any(|entry| guideline_ids.contains(entry.reference_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GuidelineMapping, MappingEntry, Scope};

    const GUIDANCE: &str = include_str!("../testdata/guidance.yaml");
    const CATALOG: &str = include_str!("../testdata/catalog.yaml");
    const CATALOG_BLANKET: &str = include_str!("../testdata/catalog_blanket.yaml");

    fn fixtures() -> (GuidanceDocument, ControlCatalog) {
        (
            serde_yaml::from_str(GUIDANCE).expect("guidance fixture"),
            serde_yaml::from_str(CATALOG).expect("catalog fixture"),
        )
    }

    fn request(mod_type: ModType) -> ModifierRequest {
        ModifierRequest {
            rationale: "Harmonize with HIPAA".to_string(),
            mod_type,
        }
    }

    fn target_ids(mapping: &Mapping) -> Vec<&str> {
        mapping
            .control_modifications
            .iter()
            .map(|m| m.target_id.as_str())
            .collect()
    }

    #[test]
    fn resolving_controls_get_one_modifier_each() {
        let (guidance, catalog) = fixtures();
        let mapping = synthesize_control_modifiers(&guidance, &catalog, &request(ModType::Alter));

        assert_eq!(mapping.reference_id, "CCC.ObjStor");
        // C01 resolves twice (req-1, req-3) and is still listed once; C02 and C04 never resolve.
        assert_eq!(target_ids(&mapping), vec!["CCC.ObjStor.C01", "CCC.ObjStor.C03"]);
    }

    #[test]
    fn modifier_copies_control_snapshot() {
        let (guidance, catalog) = fixtures();
        let mapping = synthesize_control_modifiers(&guidance, &catalog, &request(ModType::Remove));

        let first = &mapping.control_modifications[0];
        assert_eq!(first.mod_type, ModType::Remove);
        assert_eq!(first.modification_rationale, "Harmonize with HIPAA");
        assert_eq!(first.title, "Encrypt objects at rest");
        assert_eq!(first.objective, "Objects are encrypted with managed keys.");
    }

    #[test]
    fn never_more_than_one_modifier_per_control() {
        let (guidance, mut catalog) = fixtures();
        let control = &mut catalog.control_families[0].controls[0];
        for id in ["req-1", "req-2", "req-3"] {
            control.guideline_mappings.push(GuidelineMapping {
                reference_id: "SEC-BASELINE".to_string(),
                entries: vec![MappingEntry {
                    reference_id: id.to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            });
        }

        let mapping = synthesize_control_modifiers(&guidance, &catalog, &request(ModType::Add));
        let ids = target_ids(&mapping);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn no_resolvable_references_yields_empty_mapping() {
        let (guidance, _) = fixtures();
        let catalog: ControlCatalog = serde_yaml::from_str(CATALOG_BLANKET).unwrap();
        let mapping = synthesize_control_modifiers(&guidance, &catalog, &request(ModType::Alter));

        assert_eq!(mapping.reference_id, "CCC.Core");
        assert!(mapping.control_modifications.is_empty());
        assert!(mapping.assessment_requirement_modifications.is_empty());
        assert!(mapping.guideline_modifications.is_empty());
        assert_eq!(mapping.in_scope, Scope::default());
    }

    #[test]
    fn empty_guidance_resolves_nothing() {
        let (_, catalog) = fixtures();
        let mapping = synthesize_control_modifiers(
            &GuidanceDocument::default(),
            &catalog,
            &request(ModType::Alter),
        );
        assert!(mapping.control_modifications.is_empty());
    }
}
