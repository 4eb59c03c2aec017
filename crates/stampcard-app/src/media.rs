//! Stamp image uploads.
//!
//! Uploaded images come back as a stable URL, which the rest of the app
//! treats as an opaque [`ArtifactRef`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use stampcard_core::ArtifactRef;

/// External media store.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload a file and return a reference to it.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<ArtifactRef>;
}

/// Unsigned multipart upload to an HTTP media endpoint.
pub struct HttpMediaUploader {
    client: reqwest::Client,
    endpoint: String,
    upload_preset: String,
}

impl HttpMediaUploader {
    pub fn new(endpoint: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            upload_preset: upload_preset.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MediaUploader for HttpMediaUploader {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<ArtifactRef> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput(format!("{} is empty", file_name)));
        }
        tracing::debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.endpoint);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("upload_preset", self.upload_preset.clone());

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(Error::Upload(format!("{} returned {}: {}", self.endpoint, status, body)));
        }

        let artifact = parse_upload_response(&body)?;
        tracing::info!("Uploaded {} as {}", file_name, artifact);
        Ok(artifact)
    }
}

/// Pull the artifact URL out of an upload response.
pub fn parse_upload_response(body: &Value) -> Result<ArtifactRef> {
    body.get("secure_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(ArtifactRef::new)
        .ok_or_else(|| Error::Upload(format!("response has no secure_url: {}", body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_secure_url() {
        let body = json!({"secure_url": "https://cdn.example/stamps/cat.png", "bytes": 1024});
        assert_eq!(
            parse_upload_response(&body).unwrap().as_str(),
            "https://cdn.example/stamps/cat.png"
        );
    }

    #[test]
    fn missing_url_is_upload_error() {
        assert!(matches!(
            parse_upload_response(&json!({"error": {"message": "bad preset"}})),
            Err(Error::Upload(_))
        ));
        assert!(matches!(
            parse_upload_response(&json!({"secure_url": ""})),
            Err(Error::Upload(_))
        ));
    }

    #[tokio::test]
    async fn empty_file_rejected_before_request() {
        let uploader = HttpMediaUploader::new("http://127.0.0.1:9/upload", "anon_upload");
        assert!(matches!(
            uploader.upload("empty.png", Vec::new()).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
