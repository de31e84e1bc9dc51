//! Egress encoders
//!
//! Augmented records are written back as CSV (all original columns followed by
//! `new_count` and `microstate`) or NDJSON. Grouped summaries are wrapped in a
//! [`SummaryReport`] with producer metadata for the presentation layer.

use crate::error::ComputeError;
use crate::types::{AugmentedRecord, ReportProducer, SummaryMode, SummaryReport};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Derived column holding the running count
pub const RUNNING_COUNT_COLUMN: &str = "new_count";

/// Derived column holding the microstate score
pub const MICROSTATE_COLUMN: &str = "microstate";

/// Write augmented records as CSV under `columns` plus the two derived columns
pub fn encode_csv(
    columns: &[String],
    records: &[AugmentedRecord],
) -> Result<String, ComputeError> {
    let mut out = String::new();
    let header: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .chain([RUNNING_COUNT_COLUMN, MICROSTATE_COLUMN])
        .collect();
    push_csv_row(&mut out, header.iter().copied());

    for (index, record) in records.iter().enumerate() {
        if record.record.raw.len() != columns.len() {
            return Err(ComputeError::EncodingError(format!(
                "record {} has {} cells, expected {}",
                index,
                record.record.raw.len(),
                columns.len()
            )));
        }
        let running_count = record.running_count.to_string();
        let microstate = format!("{:?}", record.microstate);
        push_csv_row(
            &mut out,
            record
                .record
                .raw
                .iter()
                .map(String::as_str)
                .chain([running_count.as_str(), microstate.as_str()]),
        );
    }

    Ok(out)
}

/// Write augmented records as newline-delimited JSON
pub fn encode_ndjson(records: &[AugmentedRecord]) -> Result<String, ComputeError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

fn push_csv_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Encoder for summary reports
pub struct SummaryEncoder {
    instance_id: String,
}

impl Default for SummaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode<G>(&self, mode: SummaryMode, trials: Vec<u32>, groups: Vec<G>) -> SummaryReport<G> {
        SummaryReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            mode,
            trials,
            groups,
        }
    }

    /// Encode to pretty JSON string
    pub fn encode_to_json<G: Serialize>(
        &self,
        mode: SummaryMode,
        trials: Vec<u32>,
        groups: Vec<G>,
    ) -> Result<String, ComputeError> {
        let report = self.encode(mode, trials, groups);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperimentKeys, InteractionRecord, TrendKey, TrendSummary};

    fn augmented(raw: Vec<&str>, running_count: u32, microstate: f64) -> AugmentedRecord {
        let mut record = InteractionRecord::new(
            raw[0],
            raw[1],
            ExperimentKeys {
                content: "Face".to_string(),
                size: "20".to_string(),
                structure: "Spatial".to_string(),
                run: "1".to_string(),
            },
        );
        record.raw = raw.into_iter().map(str::to_string).collect();
        AugmentedRecord {
            record,
            trial_number: running_count,
            running_count,
            microstate,
        }
    }

    #[test]
    fn test_encode_csv_appends_derived_columns() {
        let columns = vec!["random ID".to_string(), "DecisionType".to_string()];
        let records = vec![
            augmented(vec!["p1", "X"], 1, 0.0),
            augmented(vec!["p1", "BN"], 2, 1.0 / 3.0),
        ];

        let csv = encode_csv(&columns, &records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "random ID,DecisionType,new_count,microstate");
        assert_eq!(lines[1], "p1,X,1,0.0");
        assert_eq!(lines[2], "p1,BN,2,0.3333333333333333");
    }

    #[test]
    fn test_encode_csv_quotes_fields() {
        let columns = vec!["id".to_string(), "note".to_string()];
        let records = vec![augmented(vec!["p1", "a, \"b\""], 1, 0.0)];

        let csv = encode_csv(&columns, &records).unwrap();
        assert_eq!(csv.lines().nth(1), Some("p1,\"a, \"\"b\"\"\",1,0.0"));
    }

    #[test]
    fn test_encode_csv_rejects_misaligned_record() {
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let records = vec![augmented(vec!["p1", "X"], 1, 0.0)];
        assert!(matches!(
            encode_csv(&columns, &records),
            Err(ComputeError::EncodingError(_))
        ));
    }

    #[test]
    fn test_encode_ndjson() {
        let records = vec![augmented(vec!["p1", "X"], 1, 0.0)];
        let out = encode_ndjson(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["participant_id"], "p1");
        assert_eq!(value["running_count"], 1);
        assert_eq!(value["microstate"], 0.0);
        assert_eq!(value["content"], "Face");
    }

    #[test]
    fn test_summary_report_shape() {
        let encoder = SummaryEncoder::with_instance_id("test-instance".to_string());
        let groups = vec![TrendSummary {
            key: TrendKey {
                content: "Face".to_string(),
                structure: "Spatial".to_string(),
                size: "20".to_string(),
                trial_number: 5,
            },
            count: 3,
            mean: 0.4,
            std_dev: Some(0.2),
        }];

        let json = encoder
            .encode_to_json(SummaryMode::Trend, vec![5], groups)
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["producer"]["name"], PRODUCER_NAME);
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["mode"], "trend");
        assert_eq!(payload["trials"][0], 5);
        assert_eq!(payload["groups"][0]["key"]["trial_number"], 5);
        assert_eq!(payload["groups"][0]["mean"], 0.4);
        assert!(payload["computed_at_utc"].is_string());
    }

    #[test]
    fn test_new_encoders_have_distinct_instance_ids() {
        assert_ne!(SummaryEncoder::new().instance_id, SummaryEncoder::new().instance_id);
    }
}
