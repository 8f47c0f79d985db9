use std::io::Write;

use anyhow::{Context, Result};
use sandpit_core::{Diagnostic, LineIndex};

use crate::session::{AnalysisView, FORMAT_ERROR_MESSAGE, FormattedPane};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

pub fn write_report(
    view: &AnalysisView,
    format: ReportFormat,
    print_url: bool,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        ReportFormat::Json => {
            let line = serde_json::to_string(view).context("failed to serialize analysis view")?;
            writeln!(out, "{line}")?;
        }
        ReportFormat::Text => write_text(view, print_url, out)?,
    }
    Ok(())
}

fn write_text(view: &AnalysisView, print_url: bool, out: &mut impl Write) -> Result<()> {
    let index = LineIndex::new(&view.source);

    if let Some(error) = &view.engine_error {
        writeln!(out, "engine error: {error}")?;
    }

    for diagnostic in view.diagnostics.iter() {
        write_diagnostic(diagnostic, &index, out)?;
    }

    let count = view.diagnostics.len();
    writeln!(
        out,
        "{count} issue{} (php {})",
        if count == 1 { "" } else { "s" },
        view.php_version
    )?;

    writeln!(out, "--- formatted ---")?;
    match &view.formatted {
        FormattedPane::Text(text) => write!(out, "{text}")?,
        FormattedPane::Unavailable => writeln!(out, "{FORMAT_ERROR_MESSAGE}")?,
    }

    if print_url {
        writeln!(out, "share: {}", view.share_url)?;
    }

    Ok(())
}

fn write_diagnostic(diagnostic: &Diagnostic, index: &LineIndex<'_>, out: &mut impl Write) -> Result<()> {
    let level = match diagnostic.level.trim() {
        "" => "note".to_owned(),
        level => level.to_lowercase(),
    };

    match &diagnostic.code {
        Some(code) => writeln!(out, "{level}[{code}]: {}", diagnostic.message)?,
        None => writeln!(out, "{level}: {}", diagnostic.message)?,
    }

    if let Some(annotation) = diagnostic.primary_annotation() {
        let position = index.position(annotation.span.start.offset);
        writeln!(out, "  --> {}:{}", position.line, position.column)?;
    }
    for label in diagnostic.annotation_labels() {
        writeln!(out, "   | {label}")?;
    }
    for note in &diagnostic.notes {
        writeln!(out, "   = note: {note}")?;
    }
    if let Some(help) = &diagnostic.help {
        writeln!(out, "   = help: {help}")?;
    }

    Ok(())
}
