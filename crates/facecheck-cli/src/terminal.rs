//! Terminal rendering of workflow output.
//!
//! Banners and text go to the writer (stdout in the binary); images are
//! saved as PNG under the output directory and referenced by path. With
//! [`OutputMode::Json`] every event is one JSON object per line.

use facecheck_core::{BannerLevel, Presenter, Step};
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Event<'a, T: Serialize> {
    Banner { level: BannerLevel, message: &'a str },
    Text { line: &'a str },
    Image { caption: &'a str, path: &'a Path, width: u32, height: u32 },
    ImageError { caption: &'a str, error: String },
    Outcome { step: Step, outcome: &'a T },
}

pub struct TerminalPresenter<W: Write> {
    out: W,
    mode: OutputMode,
    output_dir: PathBuf,
    images_written: usize,
    next_image_path: Option<PathBuf>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, mode: OutputMode, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            mode,
            output_dir: output_dir.into(),
            images_written: 0,
            next_image_path: None,
        }
    }

    /// Save the next rendered image at `path` instead of a generated name.
    pub fn set_next_image_path(&mut self, path: PathBuf) {
        self.next_image_path = Some(path);
    }

    /// Report a step's typed outcome. Only emitted in JSON mode.
    pub fn outcome<T: Serialize>(&mut self, step: Step, outcome: &T) {
        if self.mode == OutputMode::Json {
            self.emit(&Event::Outcome { step, outcome });
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize>(&mut self, event: &Event<'_, T>) {
        let result = match serde_json::to_string(event) {
            Ok(line) => writeln!(self.out, "{line}"),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize event");
                return;
            }
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "failed to write output");
        }
    }

    fn line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            tracing::error!(error = %err, "failed to write output");
        }
    }

    fn image_path(&mut self, caption: &str) -> PathBuf {
        self.images_written += 1;
        self.next_image_path.take().unwrap_or_else(|| {
            self.output_dir
                .join(format!("{:02}-{}.png", self.images_written, slug(caption)))
        })
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn banner(&mut self, level: BannerLevel, message: &str) {
        match self.mode {
            OutputMode::Json => self.emit::<()>(&Event::Banner { level, message }),
            OutputMode::Text => {
                let tag = match level {
                    BannerLevel::Success => "[OK]",
                    BannerLevel::Warning => "[AVISO]",
                    BannerLevel::Error => "[ERRO]",
                };
                self.line(&format!("{tag} {message}"));
            }
        }
    }

    fn text(&mut self, line: &str) {
        match self.mode {
            OutputMode::Json => self.emit::<()>(&Event::Text { line }),
            OutputMode::Text => self.line(&format!("  {line}")),
        }
    }

    fn image(&mut self, caption: &str, image: &DynamicImage) {
        let path = self.image_path(caption);
        if let Err(err) = image.save_with_format(&path, ImageFormat::Png) {
            tracing::warn!(path = %path.display(), error = %err, "failed to save image");
            let error = err.to_string();
            match self.mode {
                OutputMode::Json => self.emit::<()>(&Event::ImageError { caption, error }),
                OutputMode::Text => self.line(&format!("{caption}: falha ao salvar imagem ({error})")),
            }
            return;
        }

        tracing::debug!(path = %path.display(), caption, "image saved");
        match self.mode {
            OutputMode::Json => self.emit::<()>(&Event::Image {
                caption,
                path: &path,
                width: image.width(),
                height: image.height(),
            }),
            OutputMode::Text => self.line(&format!("{caption}: {}", path.display())),
        }
    }
}

/// ASCII file-name fragment for a caption.
fn slug(caption: &str) -> String {
    let mut slug = String::with_capacity(caption.len());
    for c in caption.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::TempDir;

    fn output(presenter: TerminalPresenter<Vec<u8>>) -> String {
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30])))
    }

    #[test]
    fn test_text_mode_banners_and_lines() {
        let tmp = TempDir::new().unwrap();
        let mut ui = TerminalPresenter::new(Vec::new(), OutputMode::Text, tmp.path());
        ui.banner(BannerLevel::Success, "Identidade confirmada");
        ui.text("Similaridade: 92.30%");
        ui.banner(BannerLevel::Warning, "Identidade não confirmada");
        ui.banner(BannerLevel::Error, "Erro ao comparar os rostos: x");
        ui.outcome(Step::Verification, &"ignored in text mode");

        assert_eq!(
            output(ui),
            "[OK] Identidade confirmada\n  Similaridade: 92.30%\n\
             [AVISO] Identidade não confirmada\n[ERRO] Erro ao comparar os rostos: x\n"
        );
    }

    #[test]
    fn test_images_saved_as_png() {
        let tmp = TempDir::new().unwrap();
        let mut ui = TerminalPresenter::new(Vec::new(), OutputMode::Text, tmp.path());
        ui.image("Imagem recebida", &sample());
        ui.image("Resultado da busca na multidão", &sample());

        let first = tmp.path().join("01-imagem-recebida.png");
        let second = tmp.path().join("02-resultado-da-busca-na-multid-o.png");
        let saved = image::open(&first).unwrap();
        assert_eq!((saved.width(), saved.height()), (8, 6));
        assert!(second.exists());

        let out = output(ui);
        assert!(out.contains(&format!("Imagem recebida: {}", first.display())));
    }

    #[test]
    fn test_next_image_path_override() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("crowd.png");
        let mut ui = TerminalPresenter::new(Vec::new(), OutputMode::Text, tmp.path());
        ui.set_next_image_path(target.clone());
        ui.image("Resultado da busca na multidão", &sample());
        ui.image("Imagem recebida", &sample());

        assert!(target.exists());
        assert!(tmp.path().join("02-imagem-recebida.png").exists());
    }

    #[test]
    fn test_json_mode_emits_one_object_per_line() {
        let tmp = TempDir::new().unwrap();
        let mut ui = TerminalPresenter::new(Vec::new(), OutputMode::Json, tmp.path());
        ui.banner(BannerLevel::Warning, "Nenhum rosto detectado na imagem.");
        ui.text("Rosto 1:");
        ui.image("Foto capturada", &sample());
        ui.outcome(Step::Document, &serde_json::json!({"status": "no_face"}));

        let out = output(ui);
        let events: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["kind"], "banner");
        assert_eq!(events[0]["level"], "warning");
        assert_eq!(events[1]["line"], "Rosto 1:");
        assert_eq!(events[2]["kind"], "image");
        assert_eq!(events[2]["width"], 8);
        assert_eq!(events[3]["step"], "document");
        assert_eq!(events[3]["outcome"]["status"], "no_face");
    }

    #[test]
    fn test_unwritable_output_dir_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does/not/exist");
        let mut ui = TerminalPresenter::new(Vec::new(), OutputMode::Text, missing);
        ui.image("Imagem recebida", &sample());
        ui.text("still running");

        let out = output(ui);
        assert!(out.contains("falha ao salvar imagem"));
        assert!(out.ends_with("  still running\n"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Imagem para verificação"), "imagem-para-verifica-o");
        assert_eq!(slug("  !!"), "image");
    }
}
