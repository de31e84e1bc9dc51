//! Pipeline configuration
//!
//! Defaults reproduce the column layout and checkpoint trials of the
//! interaction-vector data set. A config can be loaded from JSON, with any
//! omitted field falling back to its default.

use crate::error::ComputeError;
use crate::types::NEW_BEHAVIOR_TAG;
use serde::{Deserialize, Serialize};

/// Default checkpoint trials for density histograms
pub const DEFAULT_DENSITY_TRIALS: [u32; 5] = [5, 10, 20, 30, 40];

/// Default checkpoint trials for trend series
pub const DEFAULT_TREND_TRIALS: [u32; 8] = [5, 10, 15, 20, 25, 30, 35, 40];

/// Input column names for tabular ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub participant_id: String,
    pub decision_type: String,
    pub content: String,
    pub size: String,
    pub structure: String,
    pub run: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            participant_id: "random ID".to_string(),
            decision_type: "DecisionType".to_string(),
            content: "Content".to_string(),
            size: "Size".to_string(),
            structure: "Structure".to_string(),
            run: "Run".to_string(),
        }
    }
}

impl ColumnMap {
    fn names(&self) -> [(&'static str, &str); 6] {
        [
            ("participant_id", self.participant_id.as_str()),
            ("decision_type", self.decision_type.as_str()),
            ("content", self.content.as_str()),
            ("size", self.size.as_str()),
            ("structure", self.structure.as_str()),
            ("run", self.run.as_str()),
        ]
    }
}

/// Configuration shared by the computer, the aggregation pipeline and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub columns: ColumnMap,
    pub density_trials: Vec<u32>,
    pub trend_trials: Vec<u32>,
    pub new_behavior_tag: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            density_trials: DEFAULT_DENSITY_TRIALS.to_vec(),
            trend_trials: DEFAULT_TREND_TRIALS.to_vec(),
            new_behavior_tag: NEW_BEHAVIOR_TAG.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    /// Replace both trial allow-lists
    pub fn with_trials(mut self, trials: Vec<u32>) -> Self {
        self.density_trials = trials.clone();
        self.trend_trials = trials;
        self
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        for (name, column) in self.columns.names() {
            if column.trim().is_empty() {
                return Err(ComputeError::InvalidConfig(format!(
                    "column name for {name} is empty"
                )));
            }
        }

        validate_trials("density_trials", &self.density_trials)?;
        validate_trials("trend_trials", &self.trend_trials)?;

        if self.new_behavior_tag.is_empty() {
            return Err(ComputeError::InvalidConfig(
                "new_behavior_tag is empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_trials(name: &str, trials: &[u32]) -> Result<(), ComputeError> {
    if trials.is_empty() {
        return Err(ComputeError::InvalidConfig(format!("{name} is empty")));
    }
    if trials.contains(&0) {
        return Err(ComputeError::InvalidConfig(format!(
            "{name} contains trial 0; trial numbers are 1-based"
        )));
    }
    Ok(())
}

/// Parse a comma-separated trial list such as `"5,10,20"`
pub fn parse_trial_list(list: &str) -> Result<Vec<u32>, ComputeError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|e| ComputeError::InvalidConfig(format!("invalid trial '{s}': {e}")))
        })
        .collect()
}
