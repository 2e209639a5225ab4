/// MCP server implementation for Gemara artifacts.
///
/// Exposes four tools:
/// - `import_guidelines_by_criteria`: Layer 1 guidance filtered by applicability
/// - `import_controls_by_label`: Layer 2 controls filtered by labels
/// - `create_layer3_control_modifiers`: Layer 3 modifiers harmonizing controls with guidance
/// - `import_to_cue`: JSON / YAML data converted to CUE
///
/// Every call loads its documents fresh; the server holds no per-document state.
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::cue;
use crate::filter::{filter_controls, filter_guidance};
use crate::loader::DocumentLoader;
use crate::matching::{ApplicabilityCriteria, LabelSet};
use crate::model::{ControlCatalog, GuidanceDocument, Mapping};
use crate::synthesis::{synthesize_control_modifiers, ModifierRequest};
use mcp_common::mcp_api::{
    CreateControlModifiersParams, CueImportResponse, ImportControlsParams,
    ImportGuidelinesParams, ImportToCueParams, ToolArgs,
};

#[derive(Clone)]
pub struct GemaraServer {
    loader: Arc<DocumentLoader>,
    tool_router: ToolRouter<GemaraServer>,
}

impl GemaraServer {
    pub fn new(loader: DocumentLoader) -> Self {
        Self {
            loader: Arc::new(loader),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl GemaraServer {
    #[tool(description = "Imports Layer 1 Guidelines (Guidance Documents) filtered by technology domain, industry sector, or jurisdiction. Returns the matching guidelines as JSON, keeping the document's category structure.")]
    async fn import_guidelines_by_criteria(
        &self,
        Parameters(args): Parameters<ToolArgs<ImportGuidelinesParams>>,
    ) -> Result<Json<GuidanceDocument>, String> {
        let params = args.into_inner()?;
        let file_path = required(&params.file_path, "file_path")?;
        let criteria =
            ApplicabilityCriteria::new(params.technology, params.sector, params.jurisdiction);
        info!(file_path, ?criteria, "import_guidelines_by_criteria invoked");

        let doc: GuidanceDocument = self
            .loader
            .load(file_path)
            .await
            .map_err(|e| format!("error loading guidance document: {e}"))?;

        Ok(Json(filter_guidance(doc, &criteria)))
    }

    #[tool(description = "Imports Layer 2 Controls filtered by labels (assessment requirement applicability or catalog applicability categories). Returns the matching controls as JSON.")]
    async fn import_controls_by_label(
        &self,
        Parameters(args): Parameters<ToolArgs<ImportControlsParams>>,
    ) -> Result<Json<ControlCatalog>, String> {
        let params = args.into_inner()?;
        let file_path = required(&params.file_path, "file_path")?;
        let labels = LabelSet::new(&params.labels);
        if labels.is_empty() {
            return Err("At least one label must be provided".to_string());
        }
        info!(file_path, labels = labels.len(), "import_controls_by_label invoked");

        let catalog: ControlCatalog = self
            .loader
            .load(file_path)
            .await
            .map_err(|e| format!("error loading control catalog: {e}"))?;

        Ok(Json(filter_controls(catalog, &labels)))
    }

    #[tool(description = "Creates Layer 3 Control Modifiers to harmonize Layer 2 Controls with Layer 1 Guidelines. Emits one modifier for every control whose guideline mappings reference a guideline in the guidance document.")]
    async fn create_layer3_control_modifiers(
        &self,
        Parameters(args): Parameters<ToolArgs<CreateControlModifiersParams>>,
    ) -> Result<Json<Mapping>, String> {
        let params = args.into_inner()?;
        let guidelines_file = required(&params.guidelines_file, "guidelines_file")?;
        let controls_file = required(&params.controls_file, "controls_file")?;
        required(&params.modification_rationale, "modification_rationale")?;
        let request = ModifierRequest {
            rationale: params.modification_rationale.clone(),
            mod_type: params.modification_type.unwrap_or_default().into(),
        };
        info!(
            guidelines_file,
            controls_file,
            mod_type = ?request.mod_type,
            "create_layer3_control_modifiers invoked"
        );

        let (guidance, catalog) = tokio::join!(
            self.loader.load::<GuidanceDocument>(guidelines_file),
            self.loader.load::<ControlCatalog>(controls_file),
        );
        let guidance = guidance.map_err(|e| format!("error loading guidelines document: {e}"))?;
        let catalog = catalog.map_err(|e| format!("error loading controls catalog: {e}"))?;

        Ok(Json(synthesize_control_modifiers(&guidance, &catalog, &request)))
    }

    #[tool(description = "Converts JSON or YAML data to CUE format.")]
    async fn import_to_cue(
        &self,
        Parameters(args): Parameters<ToolArgs<ImportToCueParams>>,
    ) -> Result<Json<CueImportResponse>, String> {
        let params = args.into_inner()?;
        required(&params.content, "content")?;
        let cue = cue::import_to_cue(&params.content, params.format.unwrap_or_default())
            .map_err(|e| e.to_string())?;
        Ok(Json(CueImportResponse { cue }))
    }
}

fn required<'a>(value: &'a str, name: &str) -> Result<&'a str, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{name} must not be empty"));
    }
    Ok(value)
}

#[tool_handler]
impl ServerHandler for GemaraServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "gemara-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Gemara MCP server. Use import_guidelines_by_criteria to pull Layer 1 guidance \
                 for a technology, sector or jurisdiction, import_controls_by_label to pull \
                 Layer 2 controls carrying given labels, create_layer3_control_modifiers to \
                 draft Layer 3 modifiers for controls mapped to a guidance document, and \
                 import_to_cue to turn JSON or YAML data into CUE. Documents may be local \
                 paths, file:// or http(s):// URIs."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use mcp_common::fetch::FetchConfig;
    use mcp_common::mcp_api::{DataFormat, ModificationType};
    use rmcp::ServiceExt;
    use serde_json::json;

    use super::*;
    use crate::model::ModType;

    fn testdata(name: &str) -> String {
        format!("{}/testdata/{name}", env!("CARGO_MANIFEST_DIR"))
    }

    fn server() -> GemaraServer {
        GemaraServer::new(DocumentLoader::new(FetchConfig::default()).unwrap())
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = GemaraServer::tool_router().list_all();
        for name in [
            "import_guidelines_by_criteria",
            "import_controls_by_label",
            "create_layer3_control_modifiers",
            "import_to_cue",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn guidance_filter_end_to_end() {
        let params = ImportGuidelinesParams {
            file_path: testdata("guidance.yaml"),
            technology: Some("CLOUD-COMPUTING".to_string()),
            sector: None,
            jurisdiction: Some("eu".to_string()),
        };
        let Json(doc) = server()
            .import_guidelines_by_criteria(Parameters(params.into()))
            .await
            .unwrap();
        assert_eq!(doc.categories.len(), 2);

        let params = ImportGuidelinesParams {
            file_path: testdata("guidance.yaml"),
            technology: Some("iot".to_string()),
            sector: None,
            jurisdiction: None,
        };
        let Json(doc) = server()
            .import_guidelines_by_criteria(Parameters(params.into()))
            .await
            .unwrap();
        assert!(doc.categories.is_empty());
    }

    #[tokio::test]
    async fn empty_labels_rejected_before_loading() {
        for labels in [vec![], vec!["  ".to_string()]] {
            let params = ImportControlsParams {
                file_path: "/nonexistent/catalog.yaml".to_string(),
                labels,
            };
            let err = server()
                .import_controls_by_label(Parameters(params.into()))
                .await
                .err()
                .expect("tool should fail");
            assert_eq!(err, "At least one label must be provided");
        }
    }

    #[tokio::test]
    async fn control_filter_end_to_end() {
        let params = ImportControlsParams {
            file_path: testdata("catalog.yaml"),
            labels: vec!["TLP_CLEAR".to_string()],
        };
        let Json(catalog) = server()
            .import_controls_by_label(Parameters(params.into()))
            .await
            .unwrap();
        let ids: Vec<_> = catalog.controls().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["CCC.ObjStor.C01"]);
    }

    #[tokio::test]
    async fn load_failure_is_reported_as_tool_error() {
        let params = ImportControlsParams {
            file_path: "/nonexistent/catalog.yaml".to_string(),
            labels: vec!["tlp_clear".to_string()],
        };
        let err = server()
            .import_controls_by_label(Parameters(params.into()))
            .await
            .err()
            .expect("tool should fail");
        assert!(err.starts_with("error loading control catalog:"), "{err}");
    }

    #[tokio::test]
    async fn modifiers_default_to_alter() {
        let params = CreateControlModifiersParams {
            guidelines_file: testdata("guidance.yaml"),
            controls_file: testdata("catalog.yaml"),
            modification_rationale: "Harmonize with HIPAA".to_string(),
            modification_type: None,
        };
        let Json(mapping) = server()
            .create_layer3_control_modifiers(Parameters(params.into()))
            .await
            .unwrap();
        assert_eq!(mapping.reference_id, "CCC.ObjStor");
        assert_eq!(mapping.control_modifications.len(), 2);
        assert!(mapping
            .control_modifications
            .iter()
            .all(|m| m.mod_type == ModType::Alter));
    }

    #[tokio::test]
    async fn modifiers_honor_requested_type() {
        let params = CreateControlModifiersParams {
            guidelines_file: testdata("guidance.yaml"),
            controls_file: testdata("catalog.yaml"),
            modification_rationale: "Drop for internal use".to_string(),
            modification_type: Some(ModificationType::Remove),
        };
        let Json(mapping) = server()
            .create_layer3_control_modifiers(Parameters(params.into()))
            .await
            .unwrap();
        assert!(mapping
            .control_modifications
            .iter()
            .all(|m| m.mod_type == ModType::Remove));
    }

    #[tokio::test]
    async fn missing_rationale_is_a_usage_error() {
        let params = CreateControlModifiersParams {
            guidelines_file: testdata("guidance.yaml"),
            controls_file: testdata("catalog.yaml"),
            modification_rationale: String::new(),
            modification_type: None,
        };
        let err = server()
            .create_layer3_control_modifiers(Parameters(params.into()))
            .await
            .err()
            .expect("tool should fail");
        assert_eq!(err, "modification_rationale must not be empty");
    }

    #[tokio::test]
    async fn rationale_is_copied_verbatim() {
        let params = CreateControlModifiersParams {
            guidelines_file: testdata("guidance.yaml"),
            controls_file: testdata("catalog.yaml"),
            modification_rationale: "  Harmonize\n".to_string(),
            modification_type: None,
        };
        let Json(mapping) = server()
            .create_layer3_control_modifiers(Parameters(params.into()))
            .await
            .unwrap();
        assert!(!mapping.control_modifications.is_empty());
        for modifier in &mapping.control_modifications {
            assert_eq!(modifier.modification_rationale, "  Harmonize\n");
        }
    }

    #[tokio::test]
    async fn malformed_arguments_return_error_results_over_the_wire() -> anyhow::Result<()> {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server_handle = tokio::spawn(async move {
            server().serve(server_io).await?.waiting().await?;
            anyhow::Ok(())
        });
        let client = ().serve(client_io).await?;

        let calls = [
            ("import_guidelines_by_criteria", json!({}), "file_path"),
            ("import_controls_by_label", json!({ "file_path": "x.yaml" }), "labels"),
            ("import_controls_by_label", json!({ "file_path": 7, "labels": ["a"] }), "integer"),
            (
                "create_layer3_control_modifiers",
                json!({
                    "guidelines_file": "g.yaml",
                    "controls_file": "c.yaml",
                    "modification_rationale": "r",
                    "modification_type": "replace",
                }),
                "replace",
            ),
            ("import_to_cue", json!({ "content": "a: 1", "format": "toml" }), "toml"),
        ];
        for (name, arguments, mentions) in calls {
            let result = client
                .call_tool(CallToolRequestParams {
                    meta: None,
                    name: name.into(),
                    arguments: arguments.as_object().cloned(),
                    task: None,
                })
                .await?;
            assert_eq!(result.is_error, Some(true), "{name} should flag an error");
            let text = result
                .content
                .first()
                .and_then(|content| content.raw.as_text())
                .map(|text| text.text.clone())
                .unwrap_or_default();
            assert!(text.starts_with("invalid arguments:"), "{name}: {text}");
            assert!(text.contains(mentions), "{name}: {text}");
        }

        // The session survives and still serves well-formed calls.
        let result = client
            .call_tool(CallToolRequestParams {
                meta: None,
                name: "import_to_cue".into(),
                arguments: json!({ "content": "{\"id\": \"demo\"}" }).as_object().cloned(),
                task: None,
            })
            .await?;
        assert_ne!(result.is_error, Some(true));

        client.cancel().await?;
        server_handle.await??;
        Ok(())
    }

    #[tokio::test]
    async fn import_to_cue_converts_yaml() {
        let params = ImportToCueParams {
            content: "id: demo\n".to_string(),
            format: Some(DataFormat::Yaml),
        };
        let Json(response) = server().import_to_cue(Parameters(params.into())).await.unwrap();
        assert_eq!(response.cue, "id: \"demo\"\n");
    }
}
