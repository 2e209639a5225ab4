//! Loads Gemara artifacts by reference.
//!
//! Retrieval is delegated to `DocumentFetcher`; this module only decides how a body is
//! decoded. Local `.json` files are JSON, other local files are YAML, and remote bodies are
//! tried as YAML first with JSON as the fallback. Nothing is cached between calls.
use mcp_common::fetch::{DocumentFetcher, FetchConfig, FormatHint};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::model::{ControlCatalog, GuidanceDocument};

/// A layer artifact that can be loaded from a document reference.
pub trait Artifact: DeserializeOwned {
    /// Human-readable name used in error messages.
    const KIND: &'static str;
}

impl Artifact for GuidanceDocument {
    const KIND: &'static str = "guidance document";
}

impl Artifact for ControlCatalog {
    const KIND: &'static str = "control catalog";
}

#[derive(Clone)]
pub struct DocumentLoader {
    fetcher: DocumentFetcher,
}

impl DocumentLoader {
    pub fn new(config: FetchConfig) -> Result<Self, AppError> {
        Ok(Self {
            fetcher: DocumentFetcher::new(config)?,
        })
    }

    pub async fn load<T: Artifact>(&self, reference: &str) -> Result<T, AppError> {
        let document = self.fetcher.fetch(reference).await?;
        debug!(
            kind = T::KIND,
            reference,
            format = ?document.format,
            "decoding artifact"
        );
        decode(&document.body, document.format)
    }
}

/// Decode a body with the serialization the hint asks for.
pub fn decode<T: DeserializeOwned>(body: &str, format: FormatHint) -> Result<T, AppError> {
    match format {
        FormatHint::Json => serde_json::from_str(body).map_err(|e| AppError::Decode {
            format: "JSON",
            message: e.to_string(),
        }),
        FormatHint::Yaml => serde_yaml::from_str(body).map_err(|e| AppError::Decode {
            format: "YAML",
            message: e.to_string(),
        }),
        FormatHint::Unknown => match serde_yaml::from_str(body) {
            Ok(value) => Ok(value),
            Err(yaml) => serde_json::from_str(body).map_err(|json| AppError::DecodeEither {
                yaml: yaml.to_string(),
                json: json.to_string(),
            }),
        },
    }
}
