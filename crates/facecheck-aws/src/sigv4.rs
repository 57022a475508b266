//! AWS Signature Version 4 for JSON-protocol `POST /` requests.

use crate::credentials::Credentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Who signs, for which region and service, at what time.
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Headers to attach to the request in addition to the signed ones passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

impl Signature {
    /// `(name, value)` pairs to set on the outgoing request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("x-amz-date", self.amz_date.clone()),
            ("authorization", self.authorization.clone()),
        ];
        if let Some(token) = &self.security_token {
            headers.push(("x-amz-security-token", token.clone()));
        }
        headers
    }
}

/// Sign a `POST /` with an empty query string.
///
/// `headers` are the request headers to cover besides `host`, `x-amz-date`
/// and (with a session token) `x-amz-security-token`, which are added here.
pub fn sign(params: &SigningParams<'_>, host: &str, headers: &[(&str, &str)], payload: &[u8]) -> Signature {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.time.format("%Y%m%d").to_string();
    let security_token = params.credentials.aws_session_token.clone();

    let mut all_headers: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    all_headers.push(("host".into(), host.to_string()));
    all_headers.push(("x-amz-date".into(), amz_date.clone()));
    if let Some(token) = &security_token {
        all_headers.push(("x-amz-security-token".into(), token.clone()));
    }
    all_headers.sort();

    let (request, signed_headers) = canonical_request(&all_headers, payload);
    let scope = format!("{date}/{}/{}/aws4_request", params.region, params.service);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(request.as_bytes()))
    );

    let key = signing_key(
        &params.credentials.aws_secret_access_key,
        &date,
        params.region,
        params.service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    Signature {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            params.credentials.aws_access_key_id
        ),
        amz_date,
        security_token,
    }
}

/// Canonical request for `POST /` and the `;`-joined signed header names.
/// `headers` must be lowercase and sorted.
fn canonical_request(headers: &[(String, String)], payload: &[u8]) -> (String, String) {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let payload_hash = hex::encode(Sha256::digest(payload));

    (
        format!("POST\n/\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"),
        signed_headers,
    )
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(creds: &Credentials) -> SigningParams<'_> {
        SigningParams {
            credentials: creds,
            region: "us-east-1",
            service: "rekognition",
            time: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        }
    }

    const TARGET: [(&str, &str); 2] = [
        ("Content-Type", "application/x-amz-json-1.1"),
        ("X-Amz-Target", "RekognitionService.DetectFaces"),
    ];

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_canonical_request_layout() {
        let headers = vec![
            ("content-type".to_string(), "application/x-amz-json-1.1".to_string()),
            ("host".to_string(), "rekognition.us-east-1.amazonaws.com".to_string()),
        ];
        let (request, signed) = canonical_request(&headers, b"");
        assert_eq!(signed, "content-type;host");
        assert_eq!(
            request,
            "POST\n/\n\n\
             content-type:application/x-amz-json-1.1\n\
             host:rekognition.us-east-1.amazonaws.com\n\
             \n\
             content-type;host\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let sig = sign(&params(&creds), "rekognition.us-east-1.amazonaws.com", &TARGET, b"{}");

        assert_eq!(sig.amz_date, "20240309T140507Z");
        assert!(sig.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240309/us-east-1/rekognition/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature="
        ));
        let signature = sig.authorization.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig.headers().len(), 2);
    }

    #[test]
    fn test_session_token_is_signed() {
        let mut creds = Credentials::new("AKIDEXAMPLE", "secret");
        creds.aws_session_token = Some("token".into());
        let sig = sign(&params(&creds), "rekognition.us-east-1.amazonaws.com", &TARGET, b"{}");

        assert!(sig
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target,"));
        assert!(sig
            .headers()
            .contains(&("x-amz-security-token", "token".to_string())));
    }

    #[test]
    fn test_signature_covers_payload() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let host = "rekognition.us-east-1.amazonaws.com";
        let a = sign(&params(&creds), host, &TARGET, b"{\"a\":1}");
        let b = sign(&params(&creds), host, &TARGET, b"{\"a\":2}");
        let again = sign(&params(&creds), host, &TARGET, b"{\"a\":1}");
        assert_ne!(a.authorization, b.authorization);
        assert_eq!(a, again);
    }
}
