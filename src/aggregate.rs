//! Condition-level aggregation of microstate scores
//!
//! Every mode first restricts records to an allow-list of checkpoint trials,
//! then reduces each group independently. Groups are keyed by explicit key
//! structs and emitted in key order. A key combination without rows is simply
//! absent from the output.

use crate::binning::DensityBins;
use crate::stats::ScoreAccumulator;
use crate::types::{
    AugmentedRecord, CombinedDensityKey, DensityKey, DensitySummary, TrendKey, TrendPoint,
    TrendSeries, TrendSummary,
};
use std::collections::{BTreeMap, BTreeSet};

/// Set of trial numbers retained for aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSelection {
    trials: BTreeSet<u32>,
}

impl TrialSelection {
    pub fn new(trials: &[u32]) -> Self {
        Self {
            trials: trials.iter().copied().collect(),
        }
    }

    pub fn contains(&self, trial_number: u32) -> bool {
        self.trials.contains(&trial_number)
    }

    /// Selected trials in ascending order
    pub fn trials(&self) -> Vec<u32> {
        self.trials.iter().copied().collect()
    }
}

/// Groups augmented records and reduces them to density or trend summaries
#[derive(Debug, Clone, Default)]
pub struct AggregationPipeline {
    bins: DensityBins,
}

impl AggregationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bins(bins: DensityBins) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &DensityBins {
        &self.bins
    }

    /// Density histograms per (content, size, structure, run, trial)
    pub fn density(
        &self,
        records: &[AugmentedRecord],
        selection: &TrialSelection,
    ) -> Vec<DensitySummary<DensityKey>> {
        self.density_by(records, selection, |r| DensityKey {
            content: r.record.keys.content.clone(),
            size: r.record.keys.size.clone(),
            structure: r.record.keys.structure.clone(),
            run: r.record.keys.run.clone(),
            trial_number: r.trial_number,
        })
    }

    /// Density histograms per (content, structure, trial), pooled over sizes and runs
    pub fn combined_density(
        &self,
        records: &[AugmentedRecord],
        selection: &TrialSelection,
    ) -> Vec<DensitySummary<CombinedDensityKey>> {
        self.density_by(records, selection, |r| CombinedDensityKey {
            content: r.record.keys.content.clone(),
            structure: r.record.keys.structure.clone(),
            trial_number: r.trial_number,
        })
    }

    /// Mean and sample sd per (content, structure, size, trial), pooled over runs
    pub fn trend(
        &self,
        records: &[AugmentedRecord],
        selection: &TrialSelection,
    ) -> Vec<TrendSummary> {
        let groups = group_scores(records, selection, |r| TrendKey {
            content: r.record.keys.content.clone(),
            structure: r.record.keys.structure.clone(),
            size: r.record.keys.size.clone(),
            trial_number: r.trial_number,
        });

        let summaries: Vec<TrendSummary> = groups
            .into_iter()
            .filter_map(|(key, acc)| {
                let (mean, std_dev) = acc.mean_std()?;
                Some(TrendSummary {
                    key,
                    count: acc.len() as u32,
                    mean,
                    std_dev,
                })
            })
            .collect();

        log::debug!("trend mode produced {} groups", summaries.len());
        summaries
    }

    fn density_by<K, F>(
        &self,
        records: &[AugmentedRecord],
        selection: &TrialSelection,
        key_of: F,
    ) -> Vec<DensitySummary<K>>
    where
        K: Ord,
        F: Fn(&AugmentedRecord) -> K,
    {
        let groups = group_scores(records, selection, key_of);

        let summaries: Vec<DensitySummary<K>> = groups
            .into_iter()
            .filter(|(_, acc)| !acc.is_empty())
            .map(|(key, acc)| {
                let (total, bins) = self.bins.histogram(acc.sorted());
                DensitySummary { key, total, bins }
            })
            .collect();

        log::debug!("density mode produced {} groups", summaries.len());
        summaries
    }
}

/// Partition selected records into per-key score accumulators
fn group_scores<K, F>(
    records: &[AugmentedRecord],
    selection: &TrialSelection,
    key_of: F,
) -> BTreeMap<K, ScoreAccumulator>
where
    K: Ord,
    F: Fn(&AugmentedRecord) -> K,
{
    let mut groups: BTreeMap<K, ScoreAccumulator> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| selection.contains(r.trial_number))
    {
        groups.entry(key_of(record)).or_default().push(record.microstate);
    }
    groups
}

/// Arrange trend summaries into per-(content, structure, size) series.
///
/// Series are ordered by content, structure and size; points by ascending
/// trial number. Sizes without data produce no series.
pub fn trend_series(summaries: &[TrendSummary]) -> Vec<TrendSeries> {
    let mut series: BTreeMap<(String, String, String), Vec<TrendPoint>> = BTreeMap::new();
    for summary in summaries {
        let key = &summary.key;
        series
            .entry((key.content.clone(), key.structure.clone(), key.size.clone()))
            .or_default()
            .push(TrendPoint {
                trial_number: key.trial_number,
                mean: summary.mean,
                std_dev: summary.std_dev,
            });
    }

    series
        .into_iter()
        .map(|((content, structure, size), mut points)| {
            points.sort_by_key(|p| p.trial_number);
            TrendSeries {
                content,
                structure,
                size,
                points,
            }
        })
        .collect()
}
