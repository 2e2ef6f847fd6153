use ariadne::{self, Config, Label, Report, ReportKind, Source};
use std::collections::HashSet;
use std::io::{self, IsTerminal, Write};
use std::ops::Range;
use std::path::PathBuf;

/// Failure to turn one query line into a tree. Never fatal to a run; the line is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query parsed to empty structure")]
    EmptyResult,
}

/// Failures that abort a whole conversion run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("error opening input file {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("output file {} is the input file", path.display())]
    SameFile { path: PathBuf },
    #[error("error creating output file {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("error reading input file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("error writing JSON to file {}: {source}", path.display())]
    Write { path: PathBuf, source: serde_json::Error },
}

/// Constructs the parser tolerates and drops. Spans are byte ranges in the
/// preprocessed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A field term whose value could not be extracted.
    MalformedField { span: Range<usize> },
    /// A `)` without an open group.
    UnbalancedCloseParen { span: Range<usize> },
}

impl Diagnostic {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Diagnostic::MalformedField { span } => span,
            Diagnostic::UnbalancedCloseParen { span } => span,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Diagnostic::MalformedField { .. } => "Malformed field term dropped",
            Diagnostic::UnbalancedCloseParen { .. } => "Unmatched ')' ignored",
        }
    }
}

/// Prints the diagnostics of one line to stderr.
pub fn print_diagnostics(source: &str, line_number: usize, diagnostics: &[Diagnostic]) {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    if let Err(e) = write_diagnostics(source, line_number, diagnostics, color, stderr.lock()) {
        tracing::debug!(line = line_number, "failed to print diagnostics: {e}");
    }
}

/// Renders the diagnostics of one line as a single ariadne report.
pub fn write_diagnostics<W: Write>(
    source: &str,
    line_number: usize,
    diagnostics: &[Diagnostic],
    color: bool,
    writer: W,
) -> io::Result<()> {
    let source_name = format!("line {}", line_number);
    let source_name = source_name.as_str();
    let labels = format_diagnostics(source, diagnostics, source_name);

    if labels.is_empty() {
        return Ok(());
    }

    Report::build(ReportKind::Warning, (source_name, 0..0))
        .with_config(Config::default().with_color(color))
        .with_message("Parts of the query were ignored")
        .with_labels(labels)
        .finish()
        .write((source_name, Source::from(source)), writer)
}

/// Converts diagnostics into ariadne labels, one per span.
fn format_diagnostics<'a>(source: &str, diagnostics: &[Diagnostic], source_name: &'a str) -> Vec<Label<(&'a str, Range<usize>)>> {
    let mut labels = Vec::new();
    let mut reported = HashSet::<Range<usize>>::new();

    for diagnostic in diagnostics {
        let span = diagnostic.span();
        if reported.insert(span.clone()) {
            // ariadne counts chars, spans count bytes
            let span = char_offset(source, span.start)..char_offset(source, span.end);
            labels.push(Label::new((source_name, span)).with_message(diagnostic.message()));
        }
    }
    labels
}

fn char_offset(source: &str, byte: usize) -> usize {
    source.get(..byte).map_or_else(|| source.chars().count(), |prefix| prefix.chars().count())
}
