use facecheck_aws::{ClientConfig, DEFAULT_REGION};
use facecheck_core::{OutlineStyle, Threshold, WorkflowSettings};
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// AWS region of the Rekognition endpoint (default: us-east-1).
    pub region: String,
    /// Endpoint override for compatible gateways.
    pub endpoint: Option<String>,
    /// TOML file holding the AWS access key pair.
    pub secrets_path: PathBuf,
    /// Minimum similarity for identity verification.
    pub threshold: Threshold,
    /// Minimum similarity for each face of a crowd search.
    pub crowd_threshold: Threshold,
    /// Outline thickness, in pixels, on crowd results.
    pub stroke_width: u32,
    /// Per-request HTTP timeout. Unset keeps the transport default.
    pub timeout_secs: Option<u64>,
    /// Directory rendered images are written to.
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from `FACECHECK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config_dir = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".config")
            })
            .join("facecheck");

        let secrets_path = lookup("FACECHECK_SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("secrets.toml"));

        let defaults = OutlineStyle::default();

        Self {
            region: lookup("FACECHECK_REGION")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: lookup("FACECHECK_ENDPOINT").filter(|v| !v.trim().is_empty()),
            secrets_path,
            threshold: env_threshold(&lookup, "FACECHECK_THRESHOLD", Threshold::DEFAULT),
            crowd_threshold: env_threshold(&lookup, "FACECHECK_CROWD_THRESHOLD", Threshold::DEFAULT),
            stroke_width: env_u32(&lookup, "FACECHECK_STROKE_WIDTH", defaults.stroke_width),
            timeout_secs: lookup("FACECHECK_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
            output_dir: lookup("FACECHECK_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            default_threshold: self.threshold,
            crowd_threshold: self.crowd_threshold,
            outline: OutlineStyle {
                stroke_width: self.stroke_width,
                ..OutlineStyle::default()
            },
        }
    }
}

fn env_threshold(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Threshold) -> Threshold {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.parse() {
        Ok(threshold) => threshold,
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, %default, "ignoring invalid threshold");
            default
        }
    }
}

fn env_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
