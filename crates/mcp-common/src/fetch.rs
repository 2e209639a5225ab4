/// Document retrieval by reference.
///
/// A reference is a bare filesystem path, a `file://` URI, or an `http(s)://` URI. The scheme
/// is resolved before any I/O happens; the body is returned as text together with a hint about
/// which serialization to try first. Decoding is left to the caller.
///
/// Remote requests share one `reqwest::Client`, retry transient failures with capped
/// exponential backoff, and stream the body so oversized documents are rejected early.
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::error::CommonError;

const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_document_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl FetchConfig {
    /// Load fetch settings from the environment. Unset or unparsable values keep their defaults.
    ///
    /// - `GEMARA_FETCH_TIMEOUT_SECS` (default 30)
    /// - `GEMARA_FETCH_MAX_RETRIES` (default 2)
    /// - `GEMARA_FETCH_RETRY_INITIAL_MS` (default 200)
    /// - `GEMARA_FETCH_RETRY_MAX_MS` (default 5000)
    /// - `GEMARA_MAX_DOCUMENT_BYTES` (default 16 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env_parse("GEMARA_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: env_parse("GEMARA_FETCH_MAX_RETRIES").unwrap_or(defaults.max_retries),
            initial_backoff: env_parse("GEMARA_FETCH_RETRY_INITIAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: env_parse("GEMARA_FETCH_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            max_document_bytes: env_parse("GEMARA_MAX_DOCUMENT_BYTES")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_document_bytes),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Where a document reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Remote(Url),
}

/// Serialization to attempt first when decoding a fetched body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Json,
    Yaml,
    /// Nothing is known about the body; try YAML, then JSON.
    Unknown,
}

impl DocumentSource {
    /// Resolve a reference string to a source without touching the filesystem or network.
    pub fn parse(reference: &str) -> Result<Self, CommonError> {
        let reference = reference.trim();
        let Ok(url) = Url::parse(reference) else {
            // Relative and absolute paths have no scheme.
            return Ok(Self::File(PathBuf::from(reference)));
        };

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            "file" => {
                let rest = &reference["file:".len()..];
                let path = rest.strip_prefix("//").unwrap_or(rest);
                Ok(Self::File(PathBuf::from(path)))
            }
            // Windows drive letters ("C:\docs\catalog.yaml") parse as one-letter schemes.
            scheme if scheme.len() == 1 => Ok(Self::File(PathBuf::from(reference))),
            scheme => Err(CommonError::UnsupportedScheme(scheme.to_string())),
        }
    }

    pub fn format_hint(&self) -> FormatHint {
        match self {
            Self::File(path) => {
                let is_json = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
                if is_json {
                    FormatHint::Json
                } else {
                    FormatHint::Yaml
                }
            }
            Self::Remote(_) => FormatHint::Unknown,
        }
    }
}

/// A retrieved document body, not yet decoded.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source: DocumentSource,
    pub format: FormatHint,
    pub body: String,
}

#[derive(Clone)]
pub struct DocumentFetcher {
    config: FetchConfig,
    http: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("mcp-servers/document-fetcher")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Retrieve the document a reference points at.
    pub async fn fetch(&self, reference: &str) -> Result<FetchedDocument, CommonError> {
        let source = DocumentSource::parse(reference)?;
        let body = match &source {
            DocumentSource::File(path) => self.read_file(path).await?,
            DocumentSource::Remote(url) => self.fetch_remote(url).await?,
        };
        debug!(reference, bytes = body.len(), "document retrieved");

        Ok(FetchedDocument {
            format: source.format_hint(),
            source,
            body,
        })
    }

    async fn read_file(&self, path: &Path) -> Result<String, CommonError> {
        let file_error = |source| CommonError::File {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(file_error)?;
        if metadata.len() > self.config.max_document_bytes as u64 {
            return Err(CommonError::TooLarge {
                limit: self.config.max_document_bytes,
            });
        }
        tokio::fs::read_to_string(path).await.map_err(file_error)
    }

    async fn fetch_remote(&self, url: &Url) -> Result<String, CommonError> {
        self.request_with_retry(|| async move {
            let resp = self
                .http
                .get(url.clone())
                .timeout(self.config.timeout)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(CommonError::Status { status });
            }
            read_limited(resp, self.config.max_document_bytes).await
        })
        .await
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CommonError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt > self.config.max_retries || !should_retry(&e) => return Err(e),
                Err(e) => {
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "document fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn should_retry(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
        CommonError::Status { status } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<String, CommonError> {
    if resp.content_length().is_some_and(|len| len > limit as u64) {
        return Err(CommonError::TooLarge { limit });
    }

    let mut stream = resp.bytes_stream();
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(CommonError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    String::from_utf8(body).map_err(|_| CommonError::NotUtf8)
}
