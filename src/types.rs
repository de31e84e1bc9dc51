//! Core data types for the microstate pipeline
//!
//! Records flow one way: [`InteractionRecord`] → [`AugmentedRecord`] → grouped
//! summaries ([`DensitySummary`], [`TrendSummary`]).

use serde::{Deserialize, Serialize};

/// Decision tag that advances a participant's running count
pub const NEW_BEHAVIOR_TAG: &str = "BN";

/// Categorical experiment attributes, constant within a participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExperimentKeys {
    /// Stimulus content type (e.g. "Face", "Hashtag")
    pub content: String,
    /// Group size (e.g. "20", "50", "100")
    pub size: String,
    /// Spatial structure (e.g. "Homogeneous", "Spatial")
    pub structure: String,
    /// Replication run identifier
    pub run: String,
}

/// One trial of one participant, as ingested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub participant_id: String,
    pub decision_type: String,
    #[serde(flatten)]
    pub keys: ExperimentKeys,
    /// Original cell values for tabular passthrough, aligned with the source header
    #[serde(skip)]
    pub raw: Vec<String>,
}

impl InteractionRecord {
    pub fn new(
        participant_id: impl Into<String>,
        decision_type: impl Into<String>,
        keys: ExperimentKeys,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            decision_type: decision_type.into(),
            keys,
            raw: Vec::new(),
        }
    }
}

/// An interaction record with its derived microstate fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedRecord {
    #[serde(flatten)]
    pub record: InteractionRecord,
    /// 1-based position within the participant's own sequence
    pub trial_number: u32,
    /// Qualifying decisions plus one, reset per participant
    pub running_count: u32,
    /// `1 - running_count / trial_number`, always in [0, 1)
    pub microstate: f64,
}

/// Key for per-experiment density summaries
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DensityKey {
    pub content: String,
    pub size: String,
    pub structure: String,
    pub run: String,
    pub trial_number: u32,
}

/// Key for density summaries pooled over sizes and runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombinedDensityKey {
    pub content: String,
    pub structure: String,
    pub trial_number: u32,
}

/// Key for trend (mean ± sd) summaries pooled over runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrendKey {
    pub content: String,
    pub structure: String,
    pub size: String,
    pub trial_number: u32,
}

/// One histogram bin with its density-normalized height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub density: f64,
}

/// Density histogram of microstate scores for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySummary<K> {
    pub key: K,
    pub total: u32,
    pub bins: Vec<DensityBin>,
}

impl<K> DensitySummary<K> {
    /// Sum of bin areas; 1.0 for any non-empty group
    pub fn area(&self) -> f64 {
        self.bins
            .iter()
            .map(|b| b.density * (b.upper - b.lower))
            .sum()
    }
}

/// Mean and sample standard deviation of microstate scores for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub key: TrendKey,
    pub count: u32,
    pub mean: f64,
    /// Sample (n - 1) standard deviation; `None` for single-member groups
    pub std_dev: Option<f64>,
}

/// One point of a trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub trial_number: u32,
    pub mean: f64,
    pub std_dev: Option<f64>,
}

/// Trend points for one group size within a (content, structure) panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub content: String,
    pub structure: String,
    pub size: String,
    pub points: Vec<TrendPoint>,
}

/// Summary mode tag carried in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    Density,
    CombinedDensity,
    Trend,
}

/// Producer metadata for summary reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serialized summary table handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport<G> {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub mode: SummaryMode,
    pub trials: Vec<u32>,
    pub groups: Vec<G>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_area_of_empty_bins_is_zero() {
        let summary = DensitySummary {
            key: (),
            total: 0,
            bins: vec![DensityBin {
                lower: 0.0,
                upper: 0.1,
                count: 0,
                density: 0.0,
            }],
        };
        assert_eq!(summary.area(), 0.0);
    }

    #[test]
    fn test_interaction_record_json_shape() {
        let record = InteractionRecord::new(
            "p1",
            "BN",
            ExperimentKeys {
                content: "Face".to_string(),
                size: "20".to_string(),
                structure: "Spatial".to_string(),
                run: "1".to_string(),
            },
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["participant_id"], "p1");
        assert_eq!(value["content"], "Face");
        assert!(value.get("raw").is_none());
    }
}
