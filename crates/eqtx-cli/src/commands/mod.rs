//! CLI subcommands and the plumbing they share.

pub mod config;
pub mod copy;
pub mod explain;
pub mod export;
pub mod recognize;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use eqtx_core::explain::RenderedSegment;
use eqtx_core::models::session::NO_EQUATION_PLACEHOLDER;
use eqtx_core::pipeline::recognition_error_text;
use eqtx_core::{
    EqtxConfig, EquationSession, GeminiBackend, ImageInput, InputSource, KatexTypesetter,
    RecognitionResult, Transcoder,
};

use crate::host::SystemClipboard;

/// The orchestrator as the CLI wires it.
pub type CliTranscoder = Transcoder<GeminiBackend, KatexTypesetter>;

/// Where the equation comes from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Equation image (PNG, JPEG, GIF, WebP, BMP or TIFF)
    #[arg(conflicts_with_all = ["paste", "markup"])]
    pub image: Option<PathBuf>,

    /// Read the image from the system clipboard
    #[arg(long, conflicts_with = "markup")]
    pub paste: bool,

    /// Use this LaTeX source instead of recognizing an image
    #[arg(short, long)]
    pub markup: Option<String>,
}

/// Build the orchestrator from configuration.
pub fn transcoder(config: EqtxConfig) -> anyhow::Result<CliTranscoder> {
    let backend = GeminiBackend::new(config.service.gemini_options())?;
    Ok(Transcoder::new(backend, KatexTypesetter::new(), config))
}

/// Acquire the image named by `source` into `session`.
fn acquire(
    transcoder: &CliTranscoder,
    session: &mut EquationSession,
    source: &SourceArgs,
) -> anyhow::Result<()> {
    if source.paste {
        let item = SystemClipboard::read_image()?
            .ok_or_else(|| anyhow::anyhow!("The clipboard does not contain an image"))?;
        if !transcoder.acquire(session, vec![item], InputSource::Paste) {
            anyhow::bail!("The clipboard does not contain an image");
        }
        return Ok(());
    }

    let Some(path) = &source.image else {
        anyhow::bail!("No input given. Pass an image path, --paste or --markup.");
    };
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    let image = ImageInput::from_path(path)?
        .ok_or_else(|| anyhow::anyhow!("Not an image: {}", path.display()))?;
    session.acquire(image);
    Ok(())
}

/// Build a session holding recognized (or supplied) markup.
pub async fn load_session(
    transcoder: &CliTranscoder,
    source: &SourceArgs,
) -> anyhow::Result<EquationSession> {
    let mut session = EquationSession::new();

    if let Some(markup) = &source.markup {
        debug!("Using supplied markup");
        transcoder.set_markup(&mut session, markup);
        return Ok(session);
    }

    acquire(transcoder, &mut session, source)?;
    recognize_with_progress(transcoder, &mut session).await?;
    Ok(session)
}

/// Recognize the session's image, mirroring progress on a bar.
pub async fn recognize_with_progress(
    transcoder: &CliTranscoder,
    session: &mut EquationSession,
) -> anyhow::Result<()> {
    let (ticket, image) = match transcoder.begin_recognition(session) {
        Ok(started) => started,
        Err(e) => {
            // The error carries the alert text.
            session.take_alerts();
            return Err(e.into());
        }
    };

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message(session.recognized_markup().to_string());
    pb.set_position(session.progress() as u64);

    let result = transcoder.run_recognition(&image).await;
    let failure = match &result {
        RecognitionResult::Markup(_) => None,
        RecognitionResult::Empty => Some(NO_EQUATION_PLACEHOLDER.to_string()),
        RecognitionResult::ServiceError(message) => Some(recognition_error_text(message)),
    };

    transcoder.finish_recognition(session, &ticket, result);
    pb.set_position(session.progress() as u64);

    tokio::time::sleep(Duration::from_millis(transcoder.config().ui.progress_reset_ms)).await;
    transcoder.settle(session, &ticket);
    pb.finish_and_clear();

    if let Some(message) = failure {
        anyhow::bail!("{}", message);
    }
    info!("Recognized {} chars of markup", session.recognized_markup().len());
    Ok(())
}

/// Spinner shown while waiting on the service.
pub fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Print pending alerts and the visible notification.
pub fn report(session: &mut EquationSession) {
    for alert in session.take_alerts() {
        eprintln!("{} {}", style("!").yellow(), alert);
    }
    if session.notification_visible() {
        if let Some(notification) = session.notification() {
            println!("{} {}", style("✓").green(), notification.message);
        }
    }
}

/// Explanation as plain text, math spans in their source form.
pub fn explanation_text(segments: &[RenderedSegment]) -> String {
    segments.iter().map(RenderedSegment::display_text).collect()
}
