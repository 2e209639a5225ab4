use mcp_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("error decoding {format}: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    #[error("error decoding document as YAML ({yaml}) or JSON ({json})")]
    DecodeEither { yaml: String, json: String },

    #[error("config error: {0}")]
    Config(String),
}
