//! Image inference demo.
//!
//! Two flows back the dashboard's "analyze image" widget:
//! - [`InferenceClient::analyze`] forwards an uploaded image as multipart to a
//!   third-party inference endpoint and returns its binary response untouched.
//! - [`lookup_result`] maps an image URL to a result URL from a canned table,
//!   echoing the input URL when it is not listed.

use std::collections::HashMap;
use std::sync::LazyLock;

use reqwest::multipart::{Form, Part};

use crate::config::InferenceConfig;

const LOOKUP_YAML: &str = include_str!("../../data/inference_lookup.yaml");
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

static LOOKUP_TABLE: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    serde_yaml::from_str(LOOKUP_YAML).unwrap_or_else(|e| {
        tracing::error!(error = %e, "inference lookup table is malformed; lookups will echo");
        HashMap::new()
    })
});

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference endpoint not configured")]
    NotConfigured,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("inference request failed: {0}")]
    Request(String),
    #[error("inference endpoint returned status {status}")]
    Upstream { status: u16, body: String },
}

impl InferenceError {
    /// Spanish text for the dashboard widget.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured => "El servicio de análisis de imágenes no está disponible",
            Self::InvalidImage(_) => "La imagen no es válida",
            Self::Request(_) | Self::Upstream { .. } => "No se pudo analizar la imagen",
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// An uploaded image as received from the browser.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Binary result from the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOutput {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct InferenceClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl InferenceClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Request(e.to_string()))?;
        if config.endpoint.is_none() {
            tracing::warn!("INFERENCE_URL not set; image analysis disabled");
        }
        Ok(Self { http, endpoint: config.endpoint.clone() })
    }

    /// Forward `upload` as the multipart field `image`.
    ///
    /// # Errors
    ///
    /// Fails when unconfigured, when the upload is empty or oversized, or when
    /// the endpoint is unreachable or answers non-2xx.
    pub async fn analyze(&self, upload: ImageUpload) -> Result<InferenceOutput, InferenceError> {
        let endpoint = self.endpoint.as_deref().ok_or(InferenceError::NotConfigured)?;
        validate_upload(&upload)?;

        let size = upload.bytes.len();
        let content_type = upload
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&content_type)
            .map_err(|e| InferenceError::InvalidImage(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = response.status();
        let result_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(InferenceError::Upstream {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        tracing::info!(size, result_bytes = bytes.len(), "image analyzed");
        Ok(InferenceOutput { content_type: result_type, bytes: bytes.to_vec() })
    }
}

fn validate_upload(upload: &ImageUpload) -> Result<(), InferenceError> {
    if upload.bytes.is_empty() {
        return Err(InferenceError::InvalidImage("empty upload".to_owned()));
    }
    if upload.bytes.len() > MAX_IMAGE_BYTES {
        return Err(InferenceError::InvalidImage(format!(
            "{} bytes exceeds the {MAX_IMAGE_BYTES} byte limit",
            upload.bytes.len()
        )));
    }
    if let Some(ct) = upload.content_type.as_deref() {
        if !ct.starts_with("image/") && ct != DEFAULT_CONTENT_TYPE {
            return Err(InferenceError::InvalidImage(format!("unsupported content type {ct}")));
        }
    }
    Ok(())
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Result URL for an image URL. Unlisted inputs, the empty string included,
/// are echoed back unchanged.
#[must_use]
pub fn lookup_result(image_url: &str) -> String {
    LOOKUP_TABLE
        .get(image_url)
        .cloned()
        .unwrap_or_else(|| image_url.to_owned())
}

#[cfg(test)]
#[path = "inference_test.rs"]
mod tests;
