//! CLI application for equation transcription and export.

mod commands;
mod host;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, copy, explain, export, recognize};

/// Equation transcoder - turn pictures of equations into LaTeX, explanations and graphics
#[derive(Parser)]
#[command(name = "eqtx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the equation in an image
    Recognize(recognize::RecognizeArgs),

    /// Explain an equation in natural language
    Explain(explain::ExplainArgs),

    /// Export the rendered equation as SVG or copy it as an image
    Export(export::ExportArgs),

    /// Copy the LaTeX source to the clipboard
    Copy(copy::CopyArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    #[command(name = host::SERVE_CLIPBOARD, hide = true)]
    ServeClipboard(host::ServeClipboardArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Recognize(args) => recognize::run(args, cli.config.as_deref()).await,
        Commands::Explain(args) => explain::run(args, cli.config.as_deref()).await,
        Commands::Export(args) => export::run(args, cli.config.as_deref()).await,
        Commands::Copy(args) => copy::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
        Commands::ServeClipboard(args) => host::serve_clipboard(args),
    }
}
