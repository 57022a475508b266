//! facecheck-aws: AWS Rekognition backend for `facecheck-core`.
//!
//! Speaks the JSON 1.1 protocol directly over a blocking HTTP client,
//! signing each call with SigV4. Credentials come from a TOML secrets
//! file or the standard `AWS_*` environment variables.

pub mod client;
pub mod credentials;
pub mod sigv4;
pub mod wire;

pub use client::{ClientConfig, ClientError, RekognitionClient, DEFAULT_REGION};
pub use credentials::{Credentials, CredentialsError};
