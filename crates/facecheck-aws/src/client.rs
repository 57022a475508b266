//! Blocking Rekognition client.

use crate::credentials::Credentials;
use crate::sigv4::{self, SigningParams};
use crate::wire::{self, CompareFacesRequest, DetectFacesRequest, ImagePayload};
use chrono::Utc;
use facecheck_core::provider::ensure_image_bytes;
use facecheck_core::{FaceDetail, FaceMatch, Threshold, VisionError, VisionProvider};
use reqwest::Url;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const SERVICE: &str = "rekognition";
pub const DEFAULT_REGION: &str = "us-east-1";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where and how to reach the service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    /// Overrides `https://rekognition.{region}.amazonaws.com/`.
    pub endpoint: Option<String>,
    /// `None` keeps the transport's default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            timeout: None,
        }
    }
}

pub struct RekognitionClient {
    http: reqwest::blocking::Client,
    credentials: Credentials,
    region: String,
    endpoint: Url,
    /// Host header value as signed (includes a non-default port).
    host: String,
}

impl RekognitionClient {
    pub fn new(credentials: Credentials, config: &ClientConfig) -> Result<Self, ClientError> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com/", config.region));
        let url = Url::parse(&endpoint)
            .map_err(|e| ClientError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ClientError::InvalidEndpoint(format!("{endpoint}: no host"))),
        };

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        tracing::info!(
            region = %config.region,
            endpoint = %url,
            access_key = %redact_key_id(&credentials.aws_access_key_id),
            "rekognition client ready"
        );

        Ok(Self {
            http,
            credentials,
            region: config.region.clone(),
            endpoint: url,
            host,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sign and send one JSON 1.1 call, returning the 2xx body.
    fn call(&self, operation: &str, payload: Vec<u8>) -> Result<Vec<u8>, VisionError> {
        let target = format!("RekognitionService.{operation}");
        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: SERVICE,
            time: Utc::now(),
        };
        let signature = sigv4::sign(
            &params,
            &self.host,
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
            &payload,
        );

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", target.as_str());
        for (name, value) in signature.headers() {
            request = request.header(name, value);
        }

        tracing::debug!(operation, bytes = payload.len(), "sending request");
        let response = request
            .body(payload)
            .send()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = wire::provider_error(status.as_u16(), &body);
            tracing::warn!(operation, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }
        Ok(body.to_vec())
    }
}

/// Key id as it may appear in logs: only the last four characters.
fn redact_key_id(key_id: &str) -> String {
    let chars: Vec<char> = key_id.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn encode<T: serde::Serialize>(request: &T) -> Result<Vec<u8>, VisionError> {
    serde_json::to_vec(request)
        .map_err(|e| VisionError::InvalidArgument(format!("cannot encode request: {e}")))
}

impl VisionProvider for RekognitionClient {
    fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, VisionError> {
        ensure_image_bytes("input", image)?;
        let started = Instant::now();

        let payload = encode(&DetectFacesRequest::all_attributes(image))?;
        let body = self.call("DetectFaces", payload)?;
        let faces = wire::parse_detect_faces(&body)?;

        tracing::info!(
            image_bytes = image.len(),
            faces = faces.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "DetectFaces"
        );
        Ok(faces)
    }

    fn compare_faces(
        &self,
        source: &[u8],
        target: &[u8],
        threshold: Threshold,
    ) -> Result<Vec<FaceMatch>, VisionError> {
        ensure_image_bytes("source", source)?;
        ensure_image_bytes("target", target)?;
        let started = Instant::now();

        let payload = encode(&CompareFacesRequest {
            source_image: ImagePayload { bytes: source },
            target_image: ImagePayload { bytes: target },
            similarity_threshold: threshold.as_percent(),
        })?;
        let body = self.call("CompareFaces", payload)?;
        let matches = wire::parse_compare_faces(&body)?;

        tracing::info!(
            source_bytes = source.len(),
            target_bytes = target.len(),
            threshold = threshold.value(),
            matches = matches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "CompareFaces"
        );
        Ok(matches)
    }
}
