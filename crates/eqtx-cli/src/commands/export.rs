//! Export command - save or copy the rendered equation.

use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::debug;

use eqtx_core::export::Unsupported;
use eqtx_core::{
    DeliverySinks, EstimatedPreview, ExportArtifact, ExportFormat, ExportMode, ResvgRasterizer,
};

use super::{SourceArgs, load_session, report, transcoder};
use super::config;
use crate::host::{DirectorySink, SystemClipboard, TempFileViewer};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Save a file or place the equation on the clipboard
    #[arg(long, value_enum, default_value = "download")]
    mode: ModeArg,

    /// What a clipboard export places (ignored for downloads)
    #[arg(short, long, value_enum, default_value = "raster")]
    format: FormatArg,

    /// Directory downloads are written to (overrides export.output_dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// KaTeX stylesheet to embed into SVG documents (overrides export.stylesheet)
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Skip the system clipboard and go straight to the fallbacks
    #[arg(long)]
    no_clipboard: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Save an SVG document
    Download,
    /// Copy a bitmap, falling back to the SVG as text
    Clipboard,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    /// Cropped, supersampled PNG
    Raster,
    /// Vector-preserving copy where possible
    Vector,
}

impl From<ModeArg> for ExportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Download => ExportMode::Download,
            ModeArg::Clipboard => ExportMode::Clipboard,
        }
    }
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Raster => ExportFormat::Raster,
            FormatArg::Vector => ExportFormat::Vector,
        }
    }
}

pub async fn run(args: ExportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = config::load(config_path)?;
    if let Some(dir) = args.output_dir {
        config.export.output_dir = dir;
    }
    if let Some(stylesheet) = args.stylesheet {
        config.export.stylesheet = Some(stylesheet);
    }

    let styles = match &config.export.stylesheet {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read stylesheet {}: {}", path.display(), e)
        })?,
        None => String::new(),
    };
    let transcoder = transcoder(config)?;

    let mut session = load_session(&transcoder, &args.source).await?;
    session.export_mode = args.mode.into();
    session.export_format = args.format.into();

    let preview = EstimatedPreview::layout(
        session.typeset_preview().unwrap_or_default(),
        transcoder.config().export.preview_font_px,
        styles,
    )?;
    let rasterizer = ResvgRasterizer::new();
    let files = DirectorySink::new(transcoder.config().export.output_dir.clone());
    let sinks = if args.no_clipboard {
        DeliverySinks {
            image_clipboard: &Unsupported,
            text_clipboard: &Unsupported,
            viewer: &TempFileViewer,
            files: &files,
        }
    } else {
        DeliverySinks {
            image_clipboard: &SystemClipboard,
            text_clipboard: &SystemClipboard,
            viewer: &TempFileViewer,
            files: &files,
        }
    };

    let exported = transcoder
        .export(&mut session, &preview, &rasterizer, sinks)
        .await;
    let outcome = match exported {
        Ok(outcome) => outcome,
        Err(e) => {
            session.take_alerts();
            return Err(e.into());
        }
    };
    report(&mut session);

    match outcome.artifact {
        ExportArtifact::VectorDocument(document) => {
            debug!("Vector document is {} bytes", document.len())
        }
        ExportArtifact::RasterImage(image) => {
            debug!("Bitmap is {}x{}", image.width, image.height)
        }
    }

    Ok(())
}
