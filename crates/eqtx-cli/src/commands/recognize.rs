//! Recognize command - transcribe an equation image into LaTeX.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use eqtx_core::RenderedSegment;

use super::{SourceArgs, explanation_text, load_session, report, spinner, transcoder};
use super::config;

/// Arguments for the recognize command.
#[derive(Args)]
pub struct RecognizeArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Also request an explanation of the equation
    #[arg(short, long)]
    explain: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// LaTeX source (and explanation) as plain text
    Text,
    /// JSON with markup, preview HTML and explanation segments
    Json,
}

#[derive(Serialize)]
struct RecognitionReport<'a> {
    markup: &'a str,
    preview: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'a [RenderedSegment]>,
}

pub async fn run(args: RecognizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let transcoder = transcoder(config)?;

    let mut session = load_session(&transcoder, &args.source).await?;

    if args.explain {
        let pb = spinner("Generating explanation...")?;
        let explained = transcoder.explain(&mut session).await;
        pb.finish_and_clear();
        if explained.is_err() {
            session.take_alerts();
        }
        explained?;
    }
    report(&mut session);

    let output = match args.format {
        OutputFormat::Text => {
            let mut text = session.recognized_markup().to_string();
            if let Some(segments) = session.explanation_segments() {
                text.push_str("\n\n");
                text.push_str(&explanation_text(segments));
            }
            text
        }
        OutputFormat::Json => serde_json::to_string_pretty(&RecognitionReport {
            markup: session.recognized_markup(),
            preview: session.typeset_preview(),
            explanation: session.explanation_segments(),
        })?,
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}
