//! Ingestion of interaction records
//!
//! Tabular CSV input is resolved through a [`ColumnMap`]; JSON and NDJSON
//! input use the canonical field names. Every original cell is kept so that
//! egress can reproduce the input columns alongside the derived ones.

use crate::config::ColumnMap;
use crate::error::ComputeError;
use crate::types::{ExperimentKeys, InteractionRecord};
use serde_json::Value;

/// Canonical column order for records that did not come from CSV
pub const CANONICAL_COLUMNS: [&str; 6] = [
    "participant_id",
    "decision_type",
    "content",
    "size",
    "structure",
    "run",
];

/// Supported input encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON objects
    Ndjson,
    /// JSON array of objects
    Json,
}

/// Parsed records plus the column header they were read with
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub records: Vec<InteractionRecord>,
}

/// A record that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    pub index: usize,
    pub participant_id: Option<String>,
    pub reason: String,
}

impl From<RecordIssue> for ComputeError {
    fn from(issue: RecordIssue) -> Self {
        ComputeError::MalformedRecord {
            index: issue.index,
            participant_id: issue.participant_id,
            reason: issue.reason,
        }
    }
}

/// Adapter from raw input text to interaction records
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse input in the given format, failing on the first malformed record
    pub fn parse(
        input: &str,
        format: InputFormat,
        columns: &ColumnMap,
    ) -> Result<RecordBatch, ComputeError> {
        let (header, rows) = Self::rows(input, format, columns)?;
        let records = rows
            .into_iter()
            .map(|row| row.map_err(ComputeError::from))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("parsed {} records ({:?})", records.len(), format);
        Ok(RecordBatch {
            columns: header,
            records,
        })
    }

    /// Validate every record and report all issues instead of stopping at the first
    pub fn validate(
        input: &str,
        format: InputFormat,
        columns: &ColumnMap,
    ) -> Result<(usize, Vec<RecordIssue>), ComputeError> {
        let (_, rows) = Self::rows(input, format, columns)?;
        let total = rows.len();
        let issues = rows.into_iter().filter_map(Result::err).collect();
        Ok((total, issues))
    }

    fn rows(
        input: &str,
        format: InputFormat,
        columns: &ColumnMap,
    ) -> Result<(Vec<String>, Vec<Result<InteractionRecord, RecordIssue>>), ComputeError> {
        match format {
            InputFormat::Csv => csv_rows(input, columns),
            InputFormat::Ndjson => {
                let values = input
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(line_num, line)| {
                        serde_json::from_str::<Value>(line.trim()).map_err(|e| {
                            ComputeError::ParseError(format!(
                                "Failed to parse line {}: {}",
                                line_num + 1,
                                e
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json_rows(values))
            }
            InputFormat::Json => {
                let values: Vec<Value> = serde_json::from_str(input)?;
                Ok(json_rows(values))
            }
        }
    }
}

/// Column positions of the required fields within a CSV header
struct ResolvedColumns {
    participant_id: usize,
    decision_type: usize,
    content: usize,
    size: usize,
    structure: usize,
    run: usize,
}

impl ResolvedColumns {
    fn resolve(header: &[String], columns: &ColumnMap) -> Result<Self, ComputeError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ComputeError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            participant_id: find(&columns.participant_id)?,
            decision_type: find(&columns.decision_type)?,
            content: find(&columns.content)?,
            size: find(&columns.size)?,
            structure: find(&columns.structure)?,
            run: find(&columns.run)?,
        })
    }
}

fn csv_rows(
    input: &str,
    columns: &ColumnMap,
) -> Result<(Vec<String>, Vec<Result<InteractionRecord, RecordIssue>>), ComputeError> {
    let mut rows = parse_csv(input)?.into_iter();
    let mut header = rows
        .next()
        .ok_or_else(|| ComputeError::ParseError("CSV input has no header row".to_string()))?;
    if let Some(first) = header.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }
    let resolved = ResolvedColumns::resolve(&header, columns)?;

    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        if row.len() != header.len() {
            return Err(ComputeError::ParseError(format!(
                "row {} has {} fields, header has {}",
                index + 1,
                row.len(),
                header.len()
            )));
        }
        let cell = |i: usize| non_empty(&row[i]);
        let record = build_record(
            index,
            cell(resolved.participant_id),
            cell(resolved.decision_type),
            [
                cell(resolved.content),
                cell(resolved.size),
                cell(resolved.structure),
                cell(resolved.run),
            ],
            row.clone(),
        );
        records.push(record);
    }

    Ok((header, records))
}

fn json_rows(values: Vec<Value>) -> (Vec<String>, Vec<Result<InteractionRecord, RecordIssue>>) {
    let header = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
    let records = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let field = |name: &str| value.get(name).and_then(json_text);
            let participant_id = field("participant_id");
            let decision_type = field("decision_type");
            let keys = [
                field("content"),
                field("size"),
                field("structure"),
                field("run"),
            ];
            let raw = [&participant_id, &decision_type]
                .into_iter()
                .chain(keys.iter())
                .map(|v| v.clone().unwrap_or_default())
                .collect();
            build_record(index, participant_id, decision_type, keys, raw)
        })
        .collect();
    (header, records)
}

fn build_record(
    index: usize,
    participant_id: Option<String>,
    decision_type: Option<String>,
    keys: [Option<String>; 4],
    raw: Vec<String>,
) -> Result<InteractionRecord, RecordIssue> {
    let issue = |reason: &str| RecordIssue {
        index,
        participant_id: participant_id.clone(),
        reason: reason.to_string(),
    };

    let Some(pid) = participant_id.clone() else {
        return Err(issue("missing participant id"));
    };
    let Some(decision) = decision_type else {
        return Err(issue("missing decision type"));
    };

    let [content, size, structure, run] = keys;
    let (Some(content), Some(size), Some(structure), Some(run)) = (content, size, structure, run)
    else {
        return Err(issue("missing experiment attribute"));
    };

    Ok(InteractionRecord {
        participant_id: pid,
        decision_type: decision,
        keys: ExperimentKeys {
            content,
            size,
            structure,
            run,
        },
        raw,
    })
}

fn non_empty(cell: &str) -> Option<String> {
    if cell.trim().is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split CSV text into rows of fields.
///
/// Handles double-quoted fields with `""` escapes and embedded line breaks,
/// and both LF and CRLF line endings. Blank lines are skipped.
pub fn parse_csv(input: &str) -> Result<Vec<Vec<String>>, ComputeError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ComputeError::ParseError(
            "unterminated quoted field".to_string(),
        ));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}
