use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Tool arguments that always bind.
///
/// Decoding into `T` happens eagerly, but a failure (missing field, wrong type, unknown enum
/// value) is kept instead of rejecting the request, so the tool can answer with an
/// error-flagged result. The published input schema is the one of `T`.
#[derive(Debug, Clone)]
pub struct ToolArgs<T>(Result<T, String>);

impl<T> ToolArgs<T> {
    pub fn into_inner(self) -> Result<T, String> {
        self.0.map_err(|e| format!("invalid arguments: {e}"))
    }
}

impl<T> From<T> for ToolArgs<T> {
    fn from(value: T) -> Self {
        Self(Ok(value))
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ToolArgs<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self(serde_json::from_value(value).map_err(|e| e.to_string())))
    }
}

impl<T: JsonSchema> JsonSchema for ToolArgs<T> {
    fn schema_name() -> Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        T::json_schema(generator)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportGuidelinesParams {
    /// Path to the Layer 1 Guidance Document file (YAML or JSON).
    /// Supports file:// and https:// URIs.
    pub file_path: String,
    /// Filter by technology domain (e.g. "artificial-intelligence", "cloud-computing").
    pub technology: Option<String>,
    /// Filter by industry sector (e.g. "financial-services", "healthcare").
    pub sector: Option<String>,
    /// Filter by jurisdiction (e.g. "US", "EU", "HIPAA").
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportControlsParams {
    /// Path to the Layer 2 Control Catalog file (YAML or JSON).
    /// Supports file:// and https:// URIs.
    pub file_path: String,
    /// Label IDs to filter controls by (e.g. ["tlp_clear", "PII-Data-Protection"]).
    pub labels: Vec<String>,
}

/// How a Layer 3 modifier changes the control it targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    #[default]
    Alter,
    Add,
    Remove,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateControlModifiersParams {
    /// Path to the Layer 1 Guidance Document file (YAML or JSON).
    pub guidelines_file: String,
    /// Path to the Layer 2 Control Catalog file (YAML or JSON).
    pub controls_file: String,
    /// Rationale for the modifications (e.g. "Harmonize controls with HIPAA requirements").
    pub modification_rationale: String,
    /// Type of modification (default: "alter").
    pub modification_type: Option<ModificationType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportToCueParams {
    /// JSON or YAML content to convert.
    pub content: String,
    /// Input format (default: "json").
    pub format: Option<DataFormat>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CueImportResponse {
    /// Generated CUE source.
    pub cue: String,
}
