//! Copy command - put the LaTeX source on the clipboard.

use clap::Args;

use super::{SourceArgs, load_session, report, transcoder};
use super::config;
use crate::host::SystemClipboard;

/// Arguments for the copy command.
#[derive(Args)]
pub struct CopyArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Copy the source as is instead of wrapping it in $$ ... $$
    #[arg(long)]
    raw: bool,
}

pub async fn run(args: CopyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let transcoder = transcoder(config)?;

    let mut session = load_session(&transcoder, &args.source).await?;

    let copied = transcoder
        .copy_markup(&mut session, &SystemClipboard, args.raw)
        .await;
    if let Err(e) = copied {
        session.take_alerts();
        return Err(e.into());
    }
    report(&mut session);

    Ok(())
}
