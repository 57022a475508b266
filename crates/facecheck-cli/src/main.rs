use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facecheck_aws::{Credentials, RekognitionClient};
use facecheck_core::imaging::has_supported_extension;
use facecheck_core::workflow::MSG_NEED_REFERENCE;
use facecheck_core::{
    BannerLevel, CaptureSource, CrowdOutcome, DocumentOutcome, Outcome, Presenter, Session, Step,
    Threshold, VerificationOutcome, VisionProvider, Workflow,
};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use config::Config;
use terminal::{OutputMode, TerminalPresenter};

#[derive(Parser)]
#[command(
    name = "facecheck",
    version,
    about = "Verify a person against an identity document photo"
)]
struct Cli {
    /// Emit one JSON object per line instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Directory rendered images are written to (overrides FACECHECK_OUTPUT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect faces in an identity document photo
    Document {
        /// Document photo (jpg, jpeg or png)
        #[arg(value_parser = parse_input)]
        document: Input,
    },
    /// Compare a selfie or camera capture against the document face
    Verify {
        #[arg(value_parser = parse_input)]
        document: Input,
        /// Image to verify, or `-` to read a captured frame from stdin
        #[arg(value_parser = parse_input)]
        image: Input,
        /// Minimum similarity, 0-100
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<Threshold>,
        /// The image is a camera capture
        #[arg(long)]
        camera: bool,
    },
    /// Search a crowd photo for the document face
    Locate {
        #[arg(value_parser = parse_input)]
        document: Input,
        #[arg(value_parser = parse_input)]
        crowd: Input,
        /// Minimum similarity for each crowd face, 0-100
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<Threshold>,
        /// Where to write the annotated crowd image
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Run a whole session: one document, then any number of selfies and crowd photos
    Session {
        #[arg(long, value_parser = parse_input)]
        document: Input,
        /// Selfie to verify (repeatable, `-` for a camera frame on stdin)
        #[arg(long, value_parser = parse_input)]
        selfie: Vec<Input>,
        /// Crowd photo to search (repeatable)
        #[arg(long, value_parser = parse_input)]
        crowd: Vec<Input>,
        /// Minimum similarity for verification and crowd search, 0-100
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<Threshold>,
    },
}

/// An image argument: a file path or `-` for stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    fn read(&self, stdin: &mut dyn Read) -> Result<Vec<u8>> {
        match self {
            Input::Stdin => {
                let mut bytes = Vec::new();
                stdin
                    .read_to_end(&mut bytes)
                    .context("failed to read image from stdin")?;
                Ok(bytes)
            }
            Input::File(path) => std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn source(&self, camera: bool) -> CaptureSource {
        if camera || *self == Input::Stdin {
            CaptureSource::Camera
        } else {
            CaptureSource::Upload
        }
    }
}

impl Commands {
    fn inputs(&self) -> Vec<&Input> {
        match self {
            Commands::Document { document } => vec![document],
            Commands::Verify { document, image, .. } => vec![document, image],
            Commands::Locate { document, crowd, .. } => vec![document, crowd],
            Commands::Session {
                document,
                selfie,
                crowd,
                ..
            } => std::iter::once(document).chain(selfie).chain(crowd).collect(),
        }
    }

    /// Stdin holds a single image, so `-` may appear at most once.
    fn ensure_single_stdin(&self) -> Result<()> {
        let uses = self
            .inputs()
            .into_iter()
            .filter(|input| matches!(input, Input::Stdin))
            .count();
        if uses > 1 {
            bail!("`-` (stdin) can be given for only one image, got {uses}");
        }
        Ok(())
    }
}

fn parse_input(raw: &str) -> Result<Input, String> {
    if raw == "-" {
        return Ok(Input::Stdin);
    }
    let path = PathBuf::from(raw);
    if !has_supported_extension(&path) {
        return Err(format!("{raw}: expected a .jpg, .jpeg or .png file"));
    }
    Ok(Input::File(path))
}

fn parse_threshold(raw: &str) -> Result<Threshold, String> {
    raw.parse().map_err(|e: facecheck_core::VisionError| e.to_string())
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    tracing::debug!(?config, "configuration loaded");

    cli.command.ensure_single_stdin()?;

    let credentials = Credentials::load(&config.secrets_path)?;
    let client = RekognitionClient::new(credentials, &config.client_config())?;
    let workflow = Workflow::new(client, config.workflow_settings());

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;
    let mode = if cli.json { OutputMode::Json } else { OutputMode::Text };
    let mut ui = TerminalPresenter::new(std::io::stdout().lock(), mode, &config.output_dir);

    let ok = run(&workflow, cli.command, &mut std::io::stdin().lock(), &mut ui)?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Run one command in a fresh session. `true` when its goal was reached.
fn run<P: VisionProvider, W: Write>(
    workflow: &Workflow<P>,
    command: Commands,
    stdin: &mut dyn Read,
    ui: &mut TerminalPresenter<W>,
) -> Result<bool> {
    let mut session = Session::new();
    tracing::info!(session = %session.id(), "session started");

    let ok = match command {
        Commands::Document { document } => run_document(workflow, &mut session, &document, stdin, ui)?,
        Commands::Verify {
            document,
            image,
            threshold,
            camera,
        } => {
            run_document(workflow, &mut session, &document, stdin, ui)?;
            let source = image.source(camera);
            run_verification(workflow, &session, &image, source, threshold, stdin, ui)?
        }
        Commands::Locate {
            document,
            crowd,
            threshold,
            out,
        } => {
            run_document(workflow, &mut session, &document, stdin, ui)?;
            if let Some(path) = out {
                ui.set_next_image_path(path);
            }
            run_crowd(workflow, &session, &crowd, threshold, stdin, ui)?
        }
        Commands::Session {
            document,
            selfie,
            crowd,
            threshold,
        } => {
            let mut ok = run_document(workflow, &mut session, &document, stdin, ui)?;
            let offered = workflow.available_steps(&session);
            tracing::debug!(steps = ?offered, "steps available");

            let skipped = (!selfie.is_empty() && !offered.contains(&Step::Verification))
                || (!crowd.is_empty() && !offered.contains(&Step::Crowd));
            if skipped {
                ui.banner(BannerLevel::Warning, MSG_NEED_REFERENCE);
                return Ok(false);
            }

            for input in &selfie {
                ok &= run_verification(workflow, &session, input, input.source(false), threshold, stdin, ui)?;
            }
            for input in &crowd {
                ok &= run_crowd(workflow, &session, input, threshold, stdin, ui)?;
            }
            ok
        }
    };
    Ok(ok)
}

fn run_document<P: VisionProvider, W: Write>(
    workflow: &Workflow<P>,
    session: &mut Session,
    input: &Input,
    stdin: &mut dyn Read,
    ui: &mut TerminalPresenter<W>,
) -> Result<bool> {
    let outcome = workflow.on_document(session, input.read(stdin)?, ui);
    ui.outcome(Step::Document, &outcome);
    Ok(matches!(outcome, DocumentOutcome::Accepted(_)))
}

fn run_verification<P: VisionProvider, W: Write>(
    workflow: &Workflow<P>,
    session: &Session,
    input: &Input,
    source: CaptureSource,
    threshold: Option<Threshold>,
    stdin: &mut dyn Read,
    ui: &mut TerminalPresenter<W>,
) -> Result<bool> {
    let outcome = workflow.on_verification_image(session, input.read(stdin)?, source, threshold, ui);
    ui.outcome(Step::Verification, &outcome);
    Ok(matches!(
        outcome,
        VerificationOutcome::Completed(Outcome::Matched { .. })
    ))
}

fn run_crowd<P: VisionProvider, W: Write>(
    workflow: &Workflow<P>,
    session: &Session,
    input: &Input,
    threshold: Option<Threshold>,
    stdin: &mut dyn Read,
    ui: &mut TerminalPresenter<W>,
) -> Result<bool> {
    let outcome = workflow.on_crowd_image(session, input.read(stdin)?, threshold, ui);
    ui.outcome(Step::Crowd, &outcome);
    Ok(matches!(outcome, CrowdOutcome::Completed { any_match: true, .. }))
}
