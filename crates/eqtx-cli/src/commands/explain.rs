//! Explain command - describe an equation in natural language.

use clap::Args;

use super::recognize::OutputFormat;
use super::{SourceArgs, explanation_text, load_session, report, spinner, transcoder};
use super::config;

/// Arguments for the explain command.
#[derive(Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Explanation language (overrides service.explanation_language)
    #[arg(short, long)]
    language: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: ExplainArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = config::load(config_path)?;
    if let Some(language) = args.language {
        config.service.explanation_language = language;
    }
    let transcoder = transcoder(config)?;

    let mut session = load_session(&transcoder, &args.source).await?;

    let pb = spinner("Generating explanation...")?;
    let explained = transcoder.explain(&mut session).await;
    pb.finish_and_clear();
    if let Err(e) = explained {
        session.take_alerts();
        return Err(e.into());
    }
    report(&mut session);

    let segments = session.explanation_segments().unwrap_or_default();
    match args.format {
        OutputFormat::Text => println!("{}", explanation_text(segments)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(segments)?),
    }

    Ok(())
}
