//! Line-oriented conversion of query files.
//!
//! Each non-blank line of the input is parsed on its own. Lines that reduce to
//! nothing are skipped with a warning; the remaining trees are written as one JSON
//! array, in input order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{self, QueryError, RunError};
use crate::expr::QueryNode;

/// Settings for one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Two-space indented output instead of a single line.
    pub pretty: bool,
    /// Render dropped terms and unmatched parentheses to stderr.
    pub diagnostics: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions { pretty: true, diagnostics: false }
    }
}

/// A line that produced no tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based.
    pub line_number: usize,
    pub error: QueryError,
}

/// The result of parsing a stream of query lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub queries: Vec<QueryNode>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses every non-blank line of `reader`. Only read failures are errors; bytes that
/// are not valid UTF-8 are replaced rather than failing the line.
pub fn parse_lines<R: BufRead>(reader: R, options: &ConvertOptions) -> io::Result<Batch> {
    let mut batch = Batch::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line_number = index + 1;
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let analysis = crate::analyze_line(line);
        if !analysis.diagnostics.is_empty() {
            debug!(line = line_number, count = analysis.diagnostics.len(), "ignored parts of query");
            if options.diagnostics {
                error::print_diagnostics(&analysis.source, line_number, &analysis.diagnostics);
            }
        }

        match analysis.into_result() {
            Ok(query) => batch.queries.push(query),
            Err(error) => {
                warn!(line = line_number, "Error processing line {}: {}", line_number, error);
                batch.skipped.push(SkippedLine { line_number, error });
            }
        }
    }

    Ok(batch)
}

/// Derives the output file from the input file: same base name, `.json` extension.
pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_extension("json")
}

/// Writes `queries` as a JSON array followed by a newline.
pub fn write_json<W: Write>(mut writer: W, queries: &[QueryNode], pretty: bool) -> serde_json::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, queries)?;
    } else {
        serde_json::to_writer(&mut writer, queries)?;
    }
    writeln!(writer).map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)
}

/// Converts the query file at `input` into a JSON file at `output`.
///
/// The input is read completely before the output is created, and an output that
/// resolves to the input file is refused.
pub fn convert_file(input: &Path, output: &Path, options: &ConvertOptions) -> Result<Batch, RunError> {
    let file = File::open(input).map_err(|source| RunError::Open { path: input.to_path_buf(), source })?;
    if same_file(input, output) {
        return Err(RunError::SameFile { path: input.to_path_buf() });
    }

    let batch = parse_lines(BufReader::new(file), options)
        .map_err(|source| RunError::Read { path: input.to_path_buf(), source })?;

    let output_file = File::create(output).map_err(|source| RunError::Create { path: output.to_path_buf(), source })?;

    write_json(BufWriter::new(output_file), &batch.queries, options.pretty)
        .map_err(|source| RunError::Write { path: output.to_path_buf(), source })?;

    info!(
        queries = batch.queries.len(),
        skipped = batch.skipped.len(),
        output = %output.display(),
        "conversion finished"
    );
    Ok(batch)
}

fn same_file(input: &Path, output: &Path) -> bool {
    if input == output {
        return true;
    }
    match (input.canonicalize(), output.canonicalize()) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::FieldName;
    use std::io::Cursor;

    #[test]
    fn test_parse_lines() {
        let input = "TITLE(\"a\")\n\n   \nnot a query\n  \"b\" OR \"c\"  \r\n()\n";
        let batch = parse_lines(Cursor::new(input), &ConvertOptions::default()).unwrap();

        assert_eq!(
            batch.queries,
            vec![
                QueryNode::leaf(FieldName::Title, "a"),
                QueryNode::or(vec![
                    QueryNode::leaf(FieldName::Any, "b"),
                    QueryNode::leaf(FieldName::Any, "c"),
                ]),
            ]
        );
        assert_eq!(
            batch.skipped,
            vec![
                SkippedLine { line_number: 4, error: QueryError::EmptyResult },
                SkippedLine { line_number: 6, error: QueryError::EmptyResult },
            ]
        );
    }

    #[test]
    fn test_parse_lines_invalid_utf8() {
        let input: &[u8] = b"\"a\"\n\"caf\xe9\"\n\"b\"\n";
        let batch = parse_lines(Cursor::new(input), &ConvertOptions::default()).unwrap();

        assert_eq!(batch.queries.len(), 3);
        assert_eq!(batch.queries[1], QueryNode::leaf(FieldName::Any, "caf\u{FFFD}"));
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_parse_lines_empty_input() {
        let batch = parse_lines(Cursor::new(""), &ConvertOptions::default()).unwrap();
        assert_eq!(batch, Batch::default());
    }

    #[test]
    fn test_output_path_for() {
        let cases = vec![
            ("queries.txt", "queries.json"),
            ("dir/queries", "dir/queries.json"),
            ("dir/queries.v2.txt", "dir/queries.v2.json"),
            ("queries.json", "queries.json"),
        ];
        for (input, expected) in cases {
            assert_eq!(output_path_for(Path::new(input)), PathBuf::from(expected), "Input: {}", input);
        }
    }

    #[test]
    fn test_write_json_pretty() {
        let queries = vec![QueryNode::leaf(FieldName::Title, "a")];
        let mut out = Vec::new();
        write_json(&mut out, &queries, true).unwrap();
        let expected = "[\n  {\n    \"field\": {\n      \"field\": \"TITLE\",\n      \"value\": \"a\"\n    }\n  }\n]\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_write_json_compact_and_empty() {
        let mut out = Vec::new();
        write_json(&mut out, &[], false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]\n");
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("queries.txt");
        std::fs::write(&input, "TITLE(\"a\") AND NOT \"b\"\n\"\"\n").unwrap();
        let output = output_path_for(&input);

        let batch = convert_file(&input, &output, &ConvertOptions::default()).unwrap();
        assert_eq!(batch.queries.len(), 1);
        assert_eq!(batch.skipped.len(), 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([{
                "AND": [{"field": {"field": "TITLE", "value": "a"}}],
                "AND_NOT": [{"field": {"field": "ANY", "value": "b"}}],
            }])
        );
    }

    #[test]
    fn test_convert_refuses_to_overwrite_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("queries.json");
        std::fs::write(&input, "\"a\"\n\"b\"\n").unwrap();

        let result = convert_file(&input, &output_path_for(&input), &ConvertOptions::default());
        assert!(matches!(result, Err(RunError::SameFile { .. })));

        let aliased = dir.path().join(".").join("queries.json");
        let result = convert_file(&input, &aliased, &ConvertOptions::default());
        assert!(matches!(result, Err(RunError::SameFile { .. })));

        assert_eq!(std::fs::read_to_string(&input).unwrap(), "\"a\"\n\"b\"\n");
    }

    #[test]
    fn test_convert_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.txt");
        let result = convert_file(&input, &output_path_for(&input), &ConvertOptions::default());
        assert!(matches!(result, Err(RunError::Open { .. })));
    }
}
