//! pdfink binary
//!
//! Bakes a saved action list into a copy of a PDF.

use anyhow::Context;
use clap::Parser;
use pdfink_cli::{config, default_output, export, ExportJob};
use pdfink_core::ExportStyle;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfink")]
#[command(version, about = "Render ink annotations into a PDF")]
struct Args {
    /// Source PDF
    input: PathBuf,

    /// JSON action list (or a saved store with a `committed` list)
    #[arg(short, long)]
    actions: PathBuf,

    /// Output path (defaults to <stem>_annotated.<ext> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML export style; omitted keys use the defaults
    #[arg(long)]
    style: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let style = match &args.style {
        Some(path) => config::load_style(path).await?,
        None => ExportStyle::default(),
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));

    let report = export::run(ExportJob {
        input: args.input,
        actions: args.actions,
        output: output.clone(),
        style,
    })
    .await
    .context("Export failed")?;

    if report.skipped > 0 {
        tracing::warn!(skipped = report.skipped, "some actions were not rendered");
    }
    println!(
        "{} ({} of {} actions rendered)",
        output.display(),
        report.rendered,
        report.rendered + report.skipped
    );

    Ok(())
}
