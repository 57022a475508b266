//! Rekognition JSON 1.1 request and response bodies.
//!
//! Responses are deserialized leniently (every field optional) and then
//! converted into `facecheck-core` records, which rejects incomplete faces.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use facecheck_core::{AgeRange, BoundingBox, Emotion, FaceDetail, FaceMatch, VisionError};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImagePayload<'a> {
    #[serde(serialize_with = "as_base64")]
    pub bytes: &'a [u8],
}

fn as_base64<S: Serializer>(bytes: &&[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectFacesRequest<'a> {
    pub image: ImagePayload<'a>,
    pub attributes: [&'static str; 1],
}

impl<'a> DetectFacesRequest<'a> {
    /// Request every facial attribute.
    pub fn all_attributes(image: &'a [u8]) -> Self {
        Self {
            image: ImagePayload { bytes: image },
            attributes: ["ALL"],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompareFacesRequest<'a> {
    pub source_image: ImagePayload<'a>,
    pub target_image: ImagePayload<'a>,
    pub similarity_threshold: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectFacesResponse {
    #[serde(default)]
    pub face_details: Vec<WireFaceDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFaceDetail {
    pub bounding_box: Option<WireBoundingBox>,
    pub age_range: Option<WireAgeRange>,
    #[serde(default)]
    pub emotions: Vec<WireEmotion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBoundingBox {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub left: Option<f32>,
    pub top: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAgeRange {
    pub low: Option<u32>,
    pub high: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireEmotion {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompareFacesResponse {
    #[serde(default)]
    pub face_matches: Vec<WireFaceMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFaceMatch {
    pub similarity: Option<f32>,
    pub face: Option<WireComparedFace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireComparedFace {
    pub bounding_box: Option<WireBoundingBox>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(rename = "message", alias = "Message")]
    message: Option<String>,
}

fn malformed(what: &str) -> VisionError {
    VisionError::MalformedResponse(format!("missing {what}"))
}

impl TryFrom<WireBoundingBox> for BoundingBox {
    type Error = VisionError;

    fn try_from(wire: WireBoundingBox) -> Result<Self, Self::Error> {
        Ok(BoundingBox {
            left: wire.left.ok_or_else(|| malformed("BoundingBox.Left"))?,
            top: wire.top.ok_or_else(|| malformed("BoundingBox.Top"))?,
            width: wire.width.ok_or_else(|| malformed("BoundingBox.Width"))?,
            height: wire.height.ok_or_else(|| malformed("BoundingBox.Height"))?,
        })
    }
}

impl TryFrom<WireFaceDetail> for FaceDetail {
    type Error = VisionError;

    fn try_from(wire: WireFaceDetail) -> Result<Self, Self::Error> {
        let bounding_box: BoundingBox = wire
            .bounding_box
            .ok_or_else(|| malformed("FaceDetail.BoundingBox"))?
            .try_into()?;
        let age = wire.age_range.ok_or_else(|| malformed("FaceDetail.AgeRange"))?;
        let age_range = AgeRange {
            low: age.low.ok_or_else(|| malformed("AgeRange.Low"))?,
            high: age.high.ok_or_else(|| malformed("AgeRange.High"))?,
        };
        let emotions = wire
            .emotions
            .into_iter()
            .map(|e| {
                Ok(Emotion {
                    label: e.kind.ok_or_else(|| malformed("Emotion.Type"))?,
                    confidence: e.confidence.ok_or_else(|| malformed("Emotion.Confidence"))?,
                })
            })
            .collect::<Result<Vec<_>, VisionError>>()?;

        Ok(FaceDetail {
            age_range,
            emotions,
            bounding_box,
        })
    }
}

impl TryFrom<WireFaceMatch> for FaceMatch {
    type Error = VisionError;

    fn try_from(wire: WireFaceMatch) -> Result<Self, Self::Error> {
        let bounding_box: BoundingBox = wire
            .face
            .and_then(|f| f.bounding_box)
            .ok_or_else(|| malformed("FaceMatch.Face.BoundingBox"))?
            .try_into()?;
        Ok(FaceMatch {
            similarity: wire.similarity.ok_or_else(|| malformed("FaceMatch.Similarity"))?,
            bounding_box,
        })
    }
}

/// Parse and convert a DetectFaces response body.
pub fn parse_detect_faces(body: &[u8]) -> Result<Vec<FaceDetail>, VisionError> {
    let response: DetectFacesResponse = serde_json::from_slice(body)
        .map_err(|e| VisionError::MalformedResponse(format!("DetectFaces: {e}")))?;
    response
        .face_details
        .into_iter()
        .map(FaceDetail::try_from)
        .collect()
}

/// Parse and convert a CompareFaces response body.
pub fn parse_compare_faces(body: &[u8]) -> Result<Vec<FaceMatch>, VisionError> {
    let response: CompareFacesResponse = serde_json::from_slice(body)
        .map_err(|e| VisionError::MalformedResponse(format!("CompareFaces: {e}")))?;
    response
        .face_matches
        .into_iter()
        .map(FaceMatch::try_from)
        .collect()
}

/// Build a provider error from a non-2xx response.
///
/// `__type` may be namespaced (`com.amazonaws.rekognition#Code`); only the
/// code after `#` is kept.
pub fn provider_error(status: u16, body: &[u8]) -> VisionError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let (kind, message) = match parsed {
        Some(ErrorBody { kind, message }) => (kind, message),
        None => (None, None),
    };

    let code = kind
        .map(|k| k.rsplit('#').next().unwrap_or_default().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));
    let message = message.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            format!("request failed with status {status}")
        } else {
            text
        }
    });

    VisionError::Provider { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETECT_BODY: &str = r#"{
        "FaceDetails": [{
            "BoundingBox": {"Width": 0.25, "Height": 0.4, "Left": 0.3, "Top": 0.1},
            "AgeRange": {"Low": 25, "High": 35},
            "Smile": {"Value": true, "Confidence": 98.1},
            "Emotions": [
                {"Type": "CALM", "Confidence": 1.8},
                {"Type": "HAPPY", "Confidence": 97.5}
            ],
            "Confidence": 99.99
        }]
    }"#;

    #[test]
    fn test_detect_request_body() {
        let body = serde_json::to_value(DetectFacesRequest::all_attributes(b"abc")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"Image": {"Bytes": "YWJj"}, "Attributes": ["ALL"]})
        );
    }

    #[test]
    fn test_compare_request_body() {
        let request = CompareFacesRequest {
            source_image: ImagePayload { bytes: b"src" },
            target_image: ImagePayload { bytes: b"tgt" },
            similarity_threshold: 80.0,
        };
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["SourceImage"]["Bytes"], "c3Jj");
        assert_eq!(body["TargetImage"]["Bytes"], "dGd0");
        assert_eq!(body["SimilarityThreshold"], 80.0);
    }

    #[test]
    fn test_parse_detect_faces() {
        let faces = parse_detect_faces(DETECT_BODY.as_bytes()).unwrap();
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.age_range, AgeRange { low: 25, high: 35 });
        assert_eq!(face.emotions.len(), 2);
        assert_eq!(face.emotions[1].label, "HAPPY");
        assert_eq!(
            face.bounding_box,
            BoundingBox { left: 0.3, top: 0.1, width: 0.25, height: 0.4 }
        );
    }

    #[test]
    fn test_parse_detect_faces_empty() {
        assert!(parse_detect_faces(br#"{"FaceDetails": []}"#).unwrap().is_empty());
        assert!(parse_detect_faces(br#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_face_without_bounding_box_is_malformed() {
        let body = br#"{"FaceDetails": [{"AgeRange": {"Low": 1, "High": 2}, "Emotions": []}]}"#;
        assert!(matches!(
            parse_detect_faces(body),
            Err(VisionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_compare_faces() {
        let body = br#"{
            "SourceImageFace": {"BoundingBox": {"Width": 0.5, "Height": 0.5, "Left": 0.2, "Top": 0.2}, "Confidence": 99.9},
            "FaceMatches": [{
                "Similarity": 92.3,
                "Face": {"BoundingBox": {"Width": 0.4, "Height": 0.5, "Left": 0.1, "Top": 0.2}, "Confidence": 99.8}
            }],
            "UnmatchedFaces": []
        }"#;
        let matches = parse_compare_faces(body).unwrap();
        assert_eq!(matches.len(), 1);
        assert!((matches[0].similarity - 92.3).abs() < 1e-4);
    }

    #[test]
    fn test_parse_compare_faces_no_match() {
        let body = br#"{"FaceMatches": [], "UnmatchedFaces": [{"BoundingBox": {"Width": 0.1, "Height": 0.1, "Left": 0.1, "Top": 0.1}}]}"#;
        assert!(parse_compare_faces(body).unwrap().is_empty());
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        assert!(matches!(
            parse_compare_faces(b"<html>"),
            Err(VisionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_provider_error_with_namespaced_type() {
        let err = provider_error(
            400,
            br#"{"__type": "com.amazonaws.rekognition#InvalidParameterException", "Message": "Request has invalid parameters"}"#,
        );
        assert_eq!(
            err,
            VisionError::provider("InvalidParameterException", "Request has invalid parameters")
        );
    }

    #[test]
    fn test_provider_error_lowercase_message() {
        let err = provider_error(
            400,
            br#"{"__type": "UnrecognizedClientException", "message": "The security token included in the request is invalid."}"#,
        );
        assert_eq!(err.to_string(), "UnrecognizedClientException: The security token included in the request is invalid.");
    }

    #[test]
    fn test_provider_error_without_json() {
        let err = provider_error(503, b"Service Unavailable");
        assert_eq!(err, VisionError::provider("HTTP 503", "Service Unavailable"));

        let empty = provider_error(500, b"");
        assert_eq!(empty, VisionError::provider("HTTP 500", "request failed with status 500"));
    }
}
