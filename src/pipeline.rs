//! Pipeline orchestration
//!
//! Ties ingestion, microstate computation, aggregation and encoding together.
//! Pipeline: input text → Adapter → MicrostateComputer → AggregationPipeline → Encoder

use crate::adapter::{InputFormat, RecordAdapter, RecordBatch};
use crate::aggregate::{trend_series, AggregationPipeline, TrialSelection};
use crate::config::PipelineConfig;
use crate::encoder::{encode_csv, encode_ndjson, SummaryEncoder};
use crate::error::ComputeError;
use crate::microstate::MicrostateComputer;
use crate::types::{AugmentedRecord, SummaryMode};

/// Add `new_count` and `microstate` columns to a CSV export (stateless, one-shot).
///
/// Uses the default column layout.
///
/// # Example
/// ```ignore
/// let augmented_csv = csv_to_microstate_csv(&std::fs::read_to_string("trials.csv")?)?;
/// ```
pub fn csv_to_microstate_csv(input: &str) -> Result<String, ComputeError> {
    let processor = MicrostateProcessor::new();
    let batch = processor.parse(input, InputFormat::Csv)?;
    let augmented = processor.augment(&batch)?;
    encode_csv(&batch.columns, &augmented)
}

/// Configured processor for augmenting records and producing summary reports
pub struct MicrostateProcessor {
    config: PipelineConfig,
    computer: MicrostateComputer,
    aggregator: AggregationPipeline,
    encoder: SummaryEncoder,
}

impl Default for MicrostateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrostateProcessor {
    /// Create a processor with the default configuration
    pub fn new() -> Self {
        Self::from_valid_config(PipelineConfig::default())
    }

    /// Create a processor from a configuration, validating it first
    pub fn with_config(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PipelineConfig) -> Self {
        Self {
            computer: MicrostateComputer::with_tag(config.new_behavior_tag.clone()),
            aggregator: AggregationPipeline::new(),
            encoder: SummaryEncoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse input text into a record batch
    pub fn parse(&self, input: &str, format: InputFormat) -> Result<RecordBatch, ComputeError> {
        RecordAdapter::parse(input, format, &self.config.columns)
    }

    /// Compute running counts and microstate scores for a batch
    pub fn augment(&self, batch: &RecordBatch) -> Result<Vec<AugmentedRecord>, ComputeError> {
        let augmented = self.computer.compute(&batch.records)?;
        log::info!("augmented {} records", augmented.len());
        Ok(augmented)
    }

    /// Encode augmented records as CSV using the batch's columns
    pub fn to_csv(
        &self,
        batch: &RecordBatch,
        augmented: &[AugmentedRecord],
    ) -> Result<String, ComputeError> {
        encode_csv(&batch.columns, augmented)
    }

    /// Encode augmented records as NDJSON
    pub fn to_ndjson(&self, augmented: &[AugmentedRecord]) -> Result<String, ComputeError> {
        encode_ndjson(augmented)
    }

    /// Per-experiment density report over the configured density trials
    pub fn density_report(&self, augmented: &[AugmentedRecord]) -> Result<String, ComputeError> {
        let selection = TrialSelection::new(&self.config.density_trials);
        let groups = self.aggregator.density(augmented, &selection);
        log::info!("density report: {} groups", groups.len());
        self.encoder
            .encode_to_json(SummaryMode::Density, selection.trials(), groups)
    }

    /// Density report pooled over sizes and runs
    pub fn combined_density_report(
        &self,
        augmented: &[AugmentedRecord],
    ) -> Result<String, ComputeError> {
        let selection = TrialSelection::new(&self.config.density_trials);
        let groups = self.aggregator.combined_density(augmented, &selection);
        log::info!("combined density report: {} groups", groups.len());
        self.encoder
            .encode_to_json(SummaryMode::CombinedDensity, selection.trials(), groups)
    }

    /// Mean ± sd report over the configured trend trials
    pub fn trend_report(&self, augmented: &[AugmentedRecord]) -> Result<String, ComputeError> {
        let selection = TrialSelection::new(&self.config.trend_trials);
        let groups = self.aggregator.trend(augmented, &selection);
        log::info!("trend report: {} groups", groups.len());
        self.encoder
            .encode_to_json(SummaryMode::Trend, selection.trials(), groups)
    }

    /// Trend report arranged as per-size series for each (content, structure)
    pub fn trend_series_report(
        &self,
        augmented: &[AugmentedRecord],
    ) -> Result<String, ComputeError> {
        let selection = TrialSelection::new(&self.config.trend_trials);
        let series = trend_series(&self.aggregator.trend(augmented, &selection));
        log::info!("trend series report: {} series", series.len());
        self.encoder
            .encode_to_json(SummaryMode::Trend, selection.trials(), series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two Face participants (sizes 20 and 50) and one Hashtag participant, 10 trials each
    fn sample_csv() -> String {
        let mut csv = String::from("random ID,TrialNumber,DecisionType,Content,Size,Structure,Run\n");
        let participants = [
            ("f20", "Face", "20", "Spatial", "1", ["X", "BN", "X", "BN", "X", "X", "BN", "X", "X", "X"]),
            ("f50", "Face", "50", "Spatial", "1", ["BN", "BN", "BN", "BN", "BN", "X", "X", "X", "X", "X"]),
            ("h20", "Hashtag", "20", "Homogeneous", "2", ["X", "X", "X", "X", "X", "X", "X", "X", "X", "BN"]),
        ];
        for (pid, content, size, structure, run, decisions) in participants {
            for (t, decision) in decisions.iter().enumerate() {
                csv.push_str(&format!(
                    "{pid},{},{decision},{content},{size},{structure},{run}\n",
                    t + 1
                ));
            }
        }
        csv
    }

    #[test]
    fn test_csv_to_microstate_csv() {
        let out = csv_to_microstate_csv(&sample_csv()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(
            lines[0],
            "random ID,TrialNumber,DecisionType,Content,Size,Structure,Run,new_count,microstate"
        );
        assert_eq!(lines.len(), 31);
        assert_eq!(lines[1], "f20,1,X,Face,20,Spatial,1,1,0.0");
        assert_eq!(lines[2], "f20,2,BN,Face,20,Spatial,1,2,0.0");
        assert_eq!(lines[3], "f20,3,X,Face,20,Spatial,1,2,0.33333333333333337");
        assert_eq!(lines[4], "f20,4,BN,Face,20,Spatial,1,3,0.25");
    }

    #[test]
    fn test_density_report() {
        let processor =
            MicrostateProcessor::with_config(PipelineConfig::default().with_trials(vec![5, 10]))
                .unwrap();
        let batch = processor.parse(&sample_csv(), InputFormat::Csv).unwrap();
        let augmented = processor.augment(&batch).unwrap();

        let json = processor.density_report(&augmented).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["mode"], "density");
        let groups = payload["groups"].as_array().unwrap();
        // 3 participants in distinct experiments x 2 trials
        assert_eq!(groups.len(), 6);
        for group in groups {
            assert_eq!(group["total"], 1);
            assert_eq!(group["bins"].as_array().unwrap().len(), 10);
        }
    }

    #[test]
    fn test_combined_density_report() {
        let processor = MicrostateProcessor::new();
        let batch = processor.parse(&sample_csv(), InputFormat::Csv).unwrap();
        let augmented = processor.augment(&batch).unwrap();

        let json = processor.combined_density_report(&augmented).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["mode"], "combined_density");
        // Default density trials are 5,10,20,30,40; only 5 and 10 exist
        let groups = payload["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0]["key"]["content"], "Face");
        assert_eq!(groups[0]["total"], 2);
    }

    #[test]
    fn test_trend_report_values() {
        let processor = MicrostateProcessor::new();
        let batch = processor.parse(&sample_csv(), InputFormat::Csv).unwrap();
        let augmented = processor.augment(&batch).unwrap();

        let json = processor.trend_report(&augmented).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        let groups = payload["groups"].as_array().unwrap();

        // f20 at trial 5: count 3, score 1 - 3/5 = 0.4
        let f20_t5 = groups
            .iter()
            .find(|g| g["key"]["size"] == "20" && g["key"]["content"] == "Face" && g["key"]["trial_number"] == 5)
            .unwrap();
        assert!((f20_t5["mean"].as_f64().unwrap() - 0.4).abs() < 1e-9);
        assert!(f20_t5["std_dev"].is_null());

        // h20 at trial 10: count 2, score 1 - 2/10 = 0.8
        let h20_t10 = groups
            .iter()
            .find(|g| g["key"]["content"] == "Hashtag" && g["key"]["trial_number"] == 10)
            .unwrap();
        assert!((h20_t10["mean"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_trend_series_report() {
        let processor = MicrostateProcessor::new();
        let batch = processor.parse(&sample_csv(), InputFormat::Csv).unwrap();
        let augmented = processor.augment(&batch).unwrap();

        let json = processor.trend_series_report(&augmented).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        let series = payload["groups"].as_array().unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series[0]["size"], "20");
        assert_eq!(series[0]["points"][0]["trial_number"], 5);
        assert_eq!(series[0]["points"][1]["trial_number"], 10);
    }

    #[test]
    fn test_ndjson_input_roundtrip_to_csv() {
        let processor = MicrostateProcessor::new();
        let input = r#"{"participant_id": "a", "decision_type": "X", "content": "Face", "size": 20, "structure": "Spatial", "run": 1}
{"participant_id": "a", "decision_type": "BN", "content": "Face", "size": 20, "structure": "Spatial", "run": 1}"#;
        let batch = processor.parse(input, InputFormat::Ndjson).unwrap();
        let augmented = processor.augment(&batch).unwrap();

        let csv = processor.to_csv(&batch, &augmented).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "participant_id,decision_type,content,size,structure,run,new_count,microstate"
        );
        assert_eq!(lines[2], "a,BN,Face,20,Spatial,1,2,0.0");

        let ndjson = processor.to_ndjson(&augmented).unwrap();
        assert_eq!(ndjson.lines().count(), 2);
    }

    #[test]
    fn test_malformed_batch_produces_no_output() {
        let input = "random ID,DecisionType,Content,Size,Structure,Run\n\
            p1,X,Face,20,Spatial,1\n\
            p1,,Face,20,Spatial,1\n";
        assert!(matches!(
            csv_to_microstate_csv(input),
            Err(ComputeError::MalformedRecord { index: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            new_behavior_tag: String::new(),
            ..PipelineConfig::default()
        };
        assert!(MicrostateProcessor::with_config(config).is_err());
    }
}
