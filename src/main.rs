// Command-line entry point for Cyberbrain.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use cyberbrain::application::ExplainUsecase;
use cyberbrain::infrastructure::config::Config;
use cyberbrain::infrastructure::SynSourceParser;
use cyberbrain::ports::flowchart_exporter::FlowchartExporter;
use cyberbrain::ports::text_exporter::TextExporter;
use cyberbrain::ports::FlowExporter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Dot,
    Text,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tracer recording (JSON)
    #[arg(short, long)]
    recording: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "dot")]
    format: Format,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Marker call designating the target, overrides the config file
    #[arg(long)]
    marker: Option<String>,

    /// List tracked identifiers under every step
    #[arg(long)]
    show_tracking: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(marker) = cli.marker {
        config.marker.path = marker;
    }
    if cli.show_tracking {
        config.render.show_tracking = true;
    }

    let dot = FlowchartExporter::new(config.render.clone());
    let exporter: &dyn FlowExporter = match cli.format {
        Format::Dot => &dot,
        Format::Text => &TextExporter,
    };

    let usecase = ExplainUsecase {
        parser: &SynSourceParser,
        exporter,
        marker: &config.marker,
    };
    let summary = usecase.run(&cli.recording, &cli.output)?;

    println!(
        "Backtrace completed! {} appearances, {} modifications, {} switches. Output written to {}",
        summary.appearances,
        summary.modifications,
        summary.switches,
        cli.output.display()
    );
    Ok(())
}
