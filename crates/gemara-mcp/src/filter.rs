//! Applicability and label filters over Layer 1 and Layer 2 artifacts.
//!
//! Both filters keep the source order, drop non-matching leaves, and drop any container left
//! without children. Neither can fail: an all-excluding filter returns an empty artifact.
use tracing::debug;

use crate::matching::{ApplicabilityCriteria, LabelSet};
use crate::model::{Control, ControlCatalog, GuidanceDocument};

/// Narrow a guidance document to the guidelines matching `criteria`.
///
/// Applicability is declared once per document, so every guideline of a document shares
/// the same verdict; the per-guideline pass still decides which categories survive.
pub fn filter_guidance(
    doc: GuidanceDocument,
    criteria: &ApplicabilityCriteria,
) -> GuidanceDocument {
    let applicable = criteria.matches(doc.metadata.applicability.as_ref());

    let GuidanceDocument {
        metadata,
        categories,
        extra,
    } = doc;

    let categories: Vec<_> = categories
        .into_iter()
        .filter_map(|mut category| {
            category.guidelines.retain(|_| applicable);
            (!category.guidelines.is_empty()).then_some(category)
        })
        .collect();

    debug!(
        document = %metadata.id,
        applicable,
        categories = categories.len(),
        "guidance filtered"
    );

    GuidanceDocument {
        metadata,
        categories,
        extra,
    }
}

/// Narrow a control catalog to the controls carrying any of `labels`.
///
/// A control matches when one of its assessment requirements lists a label from the set.
/// Failing that, a catalog-level applicability category in the set qualifies every control
/// of the catalog.
pub fn filter_controls(catalog: ControlCatalog, labels: &LabelSet) -> ControlCatalog {
    let catalog_qualifies = catalog
        .metadata
        .applicability_categories
        .iter()
        .any(|category| labels.contains(&category.id));

    let ControlCatalog {
        metadata,
        control_families,
        extra,
    } = catalog;

    let control_families: Vec<_> = control_families
        .into_iter()
        .filter_map(|mut family| {
            family
                .controls
                .retain(|control| requirement_matches(control, labels) || catalog_qualifies);
            (!family.controls.is_empty()).then_some(family)
        })
        .collect();

    debug!(
        catalog = %metadata.id,
        catalog_qualifies,
        families = control_families.len(),
        "controls filtered"
    );

    ControlCatalog {
        metadata,
        control_families,
        extra,
    }
}

fn requirement_matches(control: &Control, labels: &LabelSet) -> bool {
    control
        .assessment_requirements
        .iter()
        .any(|req| labels.contains_any(&req.applicability))
}
