//! Load a PDF and an action list from disk, export, write the result

use anyhow::Context;
use pdfink_core::{annotated_file_name, ActionStore, Compositor, DrawAction, ExportReport, ExportStyle};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Accepted shapes of the actions file: a bare list, or a saved store
/// (`ActionStore::to_json`) whose `committed` list is exported.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionsFile {
    List(Vec<DrawAction>),
    Store { committed: Vec<DrawAction> },
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub input: PathBuf,
    pub actions: PathBuf,
    pub output: PathBuf,
    pub style: ExportStyle,
}

/// `<dir>/<stem>_annotated.<ext>` next to the input
pub fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    input.with_file_name(annotated_file_name(&name))
}

/// Parse an actions file into a store, in file order
pub fn parse_actions(json: &str) -> anyhow::Result<ActionStore> {
    let file: ActionsFile = serde_json::from_str(json).context("Failed to parse actions JSON")?;
    let actions = match file {
        ActionsFile::List(actions) => actions,
        ActionsFile::Store { committed } => committed,
    };

    let mut store = ActionStore::new();
    for action in actions {
        store.add_action(action);
    }
    Ok(store)
}

/// Run one export. The render runs on the blocking pool.
pub async fn run(job: ExportJob) -> anyhow::Result<ExportReport> {
    let source = tokio::fs::read(&job.input)
        .await
        .with_context(|| format!("Failed to read PDF: {}", job.input.display()))?;
    let json = tokio::fs::read_to_string(&job.actions)
        .await
        .with_context(|| format!("Failed to read actions: {}", job.actions.display()))?;
    let store = parse_actions(&json)
        .with_context(|| format!("Invalid actions file: {}", job.actions.display()))?;

    tracing::info!(
        input = %job.input.display(),
        actions = store.len(),
        "exporting"
    );

    let actions = store.snapshot();
    let compositor = Compositor::new(job.style);
    let (bytes, report) =
        tokio::task::spawn_blocking(move || compositor.render_with_report(&source, &actions))
            .await
            .context("Export task failed")?
            .context("Failed to render annotations")?;

    tokio::fs::write(&job.output, &bytes)
        .await
        .with_context(|| format!("Failed to write output: {}", job.output.display()))?;

    tracing::info!(output = %job.output.display(), bytes = bytes.len(), "wrote annotated PDF");
    Ok(report)
}
