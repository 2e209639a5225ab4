//! Gemara artifact model for the three layers.
//!
//! Keys are kebab-case on the wire (`control-families`, `reference-id`); camelCase and
//! snake_case spellings are accepted on input. Keys the model does not name are kept in
//! `extra` so a filtered artifact serializes with the content it was loaded with.
use std::collections::BTreeMap;

use mcp_common::mcp_api::ModificationType;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Fields of an artifact that the model does not interpret.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Treat an explicit `null` (e.g. a YAML key with no value) like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Layer 1: guidance ---

/// A Layer 1 guidance document (standards, regulations, frameworks).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GuidanceDocument {
    #[serde(default)]
    pub metadata: GuidanceMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GuidanceMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Where the whole document applies. Shared by every guideline in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicability: Option<Applicability>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Applicability {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        alias = "technologyDomains",
        alias = "technology_domains"
    )]
    pub technology_domains: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        alias = "industrySectors",
        alias = "industry_sectors"
    )]
    pub industry_sectors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jurisdictions: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub guidelines: Vec<Guideline>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Guideline {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub objective: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub recommendations: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl GuidanceDocument {
    pub fn guidelines(&self) -> impl Iterator<Item = &Guideline> {
        self.categories.iter().flat_map(|c| c.guidelines.iter())
    }
}

// --- Layer 2: controls ---

/// A Layer 2 control catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ControlCatalog {
    #[serde(default)]
    pub metadata: CatalogMetadata,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        alias = "controlFamilies",
        alias = "control_families"
    )]
    pub control_families: Vec<ControlFamily>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Catalog-wide labels. A hit here qualifies every control in the catalog.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty",
        alias = "applicabilityCategories",
        alias = "applicability_categories"
    )]
    pub applicability_categories: Vec<ApplicabilityCategory>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplicabilityCategory {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlFamily {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub controls: Vec<Control>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Control {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub objective: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty",
        alias = "assessmentRequirements",
        alias = "assessment_requirements"
    )]
    pub assessment_requirements: Vec<AssessmentRequirement>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty",
        alias = "guidelineMappings",
        alias = "guideline_mappings"
    )]
    pub guideline_mappings: Vec<GuidelineMapping>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssessmentRequirement {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub applicability: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Reference edges from a control to the items of one external document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct GuidelineMapping {
    #[serde(default, alias = "referenceId", alias = "reference_id")]
    pub reference_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<MappingEntry>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct MappingEntry {
    /// Guideline id this entry points at.
    #[serde(default, alias = "referenceId", alias = "reference_id")]
    pub reference_id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ControlCatalog {
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.control_families.iter().flat_map(|f| f.controls.iter())
    }
}

// --- Layer 3: policy modifiers ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModType {
    #[default]
    Alter,
    Add,
    Remove,
}

impl From<ModificationType> for ModType {
    fn from(value: ModificationType) -> Self {
        match value {
            ModificationType::Alter => Self::Alter,
            ModificationType::Add => Self::Add,
            ModificationType::Remove => Self::Remove,
        }
    }
}

/// Harmonization mapping from one control catalog to a policy context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct Mapping {
    /// Id of the catalog the modifiers apply to.
    pub reference_id: String,
    pub in_scope: Scope,
    pub out_of_scope: Scope,
    pub control_modifications: Vec<ControlModifier>,
    pub assessment_requirement_modifications: Vec<AssessmentRequirementModifier>,
    pub guideline_modifications: Vec<GuidelineModifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geopolitical: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// Editable snapshot of a control, adapted for one policy context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ControlModifier {
    pub target_id: String,
    pub mod_type: ModType,
    pub modification_rationale: String,
    pub title: String,
    pub objective: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct AssessmentRequirementModifier {
    pub target_id: String,
    pub mod_type: ModType,
    pub modification_rationale: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applicability: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct GuidelineModifier {
    pub target_id: String,
    pub mod_type: ModType,
    pub modification_rationale: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub objective: String,
}
