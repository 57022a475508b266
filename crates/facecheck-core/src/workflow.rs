//! Identity-verification workflow.
//!
//! Each handler runs one operator-triggered step to completion: document
//! upload, verification image (upload or camera), crowd photo. Failures are
//! rendered through the [`Presenter`] and never escape the step; the session
//! keeps whatever the earlier steps established.

use crate::comparator::{self, Outcome};
use crate::crowd::{self, CrowdFace};
use crate::extractor::{self, FaceRecord};
use crate::imaging::{ImageData, OutlineStyle};
use crate::provider::VisionProvider;
use crate::session::Session;
use crate::types::Threshold;
use image::DynamicImage;
use serde::Serialize;

/// Shown when a gated step is requested before a document was accepted.
pub const MSG_NEED_REFERENCE: &str = "Envie primeiro a foto de um documento com um rosto visível.";
const MSG_NO_FACE: &str = "Nenhum rosto detectado na imagem.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
}

/// Output surface: status banners, text lines, rendered images.
pub trait Presenter {
    fn banner(&mut self, level: BannerLevel, message: &str);
    fn text(&mut self, line: &str);
    fn image(&mut self, caption: &str, image: &DynamicImage);
}

/// Steps the operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Document,
    Verification,
    Crowd,
}

/// Where a verification image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Upload,
    Camera,
}

impl CaptureSource {
    fn caption(self) -> &'static str {
        match self {
            CaptureSource::Upload => "Imagem para verificação",
            CaptureSource::Camera => "Foto capturada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowSettings {
    /// Used by the verification step when the caller gives no threshold.
    pub default_threshold: Threshold,
    /// Used by the crowd step when the caller gives no threshold.
    pub crowd_threshold: Threshold,
    pub outline: OutlineStyle,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_threshold: Threshold::DEFAULT,
            crowd_threshold: Threshold::DEFAULT,
            outline: OutlineStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The document became the session's reference.
    Accepted(Vec<FaceRecord>),
    NoFace,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Completed(Outcome),
    Failed(String),
    /// No reference face yet.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CrowdOutcome {
    Completed { any_match: bool, faces: Vec<CrowdFace> },
    Failed(String),
    /// No reference face yet.
    Unavailable,
}

pub struct Workflow<P> {
    provider: P,
    settings: WorkflowSettings,
}

impl<P: VisionProvider> Workflow<P> {
    pub fn new(provider: P, settings: WorkflowSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Steps offered for the current session state.
    pub fn available_steps(&self, session: &Session) -> Vec<Step> {
        if session.has_reference() {
            vec![Step::Document, Step::Verification, Step::Crowd]
        } else {
            vec![Step::Document]
        }
    }

    /// Detect faces in a document photo and, if any, make it the reference.
    pub fn on_document(
        &self,
        session: &mut Session,
        bytes: Vec<u8>,
        ui: &mut dyn Presenter,
    ) -> DocumentOutcome {
        let image = match ImageData::decode(bytes) {
            Ok(image) => image,
            Err(err) => return DocumentOutcome::Failed(report_image_error(ui, &err)),
        };
        ui.image("Imagem recebida", image.pixels());

        let faces = match self.provider.detect_faces(image.bytes()) {
            Ok(faces) => faces,
            Err(err) => {
                tracing::warn!(session = %session.id(), error = %err, "document detection failed");
                return DocumentOutcome::Failed(report_image_error(ui, &err));
            }
        };

        if faces.is_empty() {
            tracing::info!(session = %session.id(), "no face in document");
            ui.banner(BannerLevel::Warning, MSG_NO_FACE);
            return DocumentOutcome::NoFace;
        }

        ui.banner(BannerLevel::Success, "Rosto encontrado na imagem");
        let records = extractor::extract(&faces);
        for record in &records {
            for line in describe_face(record) {
                ui.text(&line);
            }
        }

        session.accept_reference(image, faces);
        DocumentOutcome::Accepted(records)
    }

    /// Compare a selfie or camera capture against the session's reference.
    pub fn on_verification_image(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        source: CaptureSource,
        threshold: Option<Threshold>,
        ui: &mut dyn Presenter,
    ) -> VerificationOutcome {
        let Some(reference) = session.reference() else {
            ui.banner(BannerLevel::Warning, MSG_NEED_REFERENCE);
            return VerificationOutcome::Unavailable;
        };
        let threshold = threshold.unwrap_or(self.settings.default_threshold);

        let candidate = match ImageData::decode(bytes) {
            Ok(image) => image,
            Err(err) => return VerificationOutcome::Failed(report_image_error(ui, &err)),
        };
        ui.image(source.caption(), candidate.pixels());

        match comparator::verify(&self.provider, reference, &candidate, threshold) {
            Ok(outcome) => {
                tracing::info!(
                    session = %session.id(),
                    ?source,
                    threshold = threshold.value(),
                    ?outcome,
                    "verification finished"
                );
                render_outcome(ui, outcome, threshold);
                VerificationOutcome::Completed(outcome)
            }
            Err(err) => {
                tracing::warn!(session = %session.id(), error = %err, "verification failed");
                let message = format!("Erro ao comparar os rostos: {err}");
                ui.banner(BannerLevel::Error, &message);
                VerificationOutcome::Failed(message)
            }
        }
    }

    /// Search a crowd photo for the reference person and render the annotated image.
    pub fn on_crowd_image(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        threshold: Option<Threshold>,
        ui: &mut dyn Presenter,
    ) -> CrowdOutcome {
        let Some(reference) = session.reference() else {
            ui.banner(BannerLevel::Warning, MSG_NEED_REFERENCE);
            return CrowdOutcome::Unavailable;
        };
        let threshold = threshold.unwrap_or(self.settings.crowd_threshold);

        let crowd_image = match ImageData::decode(bytes) {
            Ok(image) => image,
            Err(err) => return CrowdOutcome::Failed(report_image_error(ui, &err)),
        };

        let report = match crowd::locate(
            &self.provider,
            reference,
            &crowd_image,
            threshold,
            &self.settings.outline,
        ) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(session = %session.id(), error = %err, "crowd search failed");
                return CrowdOutcome::Failed(report_image_error(ui, &err));
            }
        };

        ui.image("Resultado da busca na multidão", &report.image);
        if report.faces.is_empty() {
            ui.banner(BannerLevel::Warning, MSG_NO_FACE);
        } else if report.any_match {
            ui.banner(BannerLevel::Success, "Pessoa encontrada na multidão");
        } else {
            ui.banner(BannerLevel::Warning, "Pessoa não encontrada na multidão");
        }
        for face in &report.faces {
            ui.text(&describe_crowd_face(face));
        }

        CrowdOutcome::Completed {
            any_match: report.any_match,
            faces: report.faces,
        }
    }
}

fn report_image_error(ui: &mut dyn Presenter, err: &dyn std::fmt::Display) -> String {
    let message = format!("Erro ao processar a imagem: {err}. Verifique o arquivo");
    ui.banner(BannerLevel::Error, &message);
    message
}

fn render_outcome(ui: &mut dyn Presenter, outcome: Outcome, threshold: Threshold) {
    match outcome {
        Outcome::Matched { similarity } => {
            ui.banner(BannerLevel::Success, "Identidade confirmada");
            ui.text(&format!("Similaridade: {similarity:.2}%"));
        }
        Outcome::NotMatched => {
            ui.banner(BannerLevel::Warning, "Identidade não confirmada");
            ui.text(&format!(
                "Nenhuma correspondência com similaridade de pelo menos {threshold}%"
            ));
        }
    }
}

/// Text lines shown for one document face.
pub fn describe_face(record: &FaceRecord) -> Vec<String> {
    let labels: Vec<String> = record
        .detected_emotions
        .iter()
        .map(|label| format!("'{label}'"))
        .collect();

    let mut lines = vec![
        format!("Rosto {}:", record.index),
        format!(
            "Idade estimada: {} - {} anos",
            record.age_range.low, record.age_range.high
        ),
        format!("Emoções detectadas: [{}]", labels.join(", ")),
    ];
    if let Some(top) = &record.predominant_emotion {
        lines.push(format!(
            "Emoção predominante: {}, Confiança: {:.2}%",
            top.label, top.confidence
        ));
    }
    lines
}

fn describe_crowd_face(face: &CrowdFace) -> String {
    match face.similarity {
        Some(similarity) => format!(
            "Rosto {}: correspondência (Similaridade: {similarity:.2}%)",
            face.index
        ),
        None => format!("Rosto {}: sem correspondência", face.index),
    }
}
