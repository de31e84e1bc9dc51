//! Per-participant microstate computation
//!
//! Each participant's records form an independent sequence. A running count
//! starts at 1 on the first trial and advances by one on every later trial
//! whose decision is the new-behavior tag. The microstate score of trial `t`
//! is `1 - running_count / t`.

use crate::error::ComputeError;
use crate::types::{AugmentedRecord, InteractionRecord, NEW_BEHAVIOR_TAG};
use std::collections::HashMap;

/// Fold state carried through one participant's sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub counter: u32,
}

impl Default for CounterState {
    fn default() -> Self {
        Self { counter: 1 }
    }
}

/// Computes running counts and microstate scores
#[derive(Debug, Clone)]
pub struct MicrostateComputer {
    new_behavior_tag: String,
}

impl Default for MicrostateComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrostateComputer {
    /// Create a computer that counts `"BN"` decisions
    pub fn new() -> Self {
        Self::with_tag(NEW_BEHAVIOR_TAG)
    }

    /// Create a computer that counts decisions equal to `tag`
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            new_behavior_tag: tag.into(),
        }
    }

    pub fn new_behavior_tag(&self) -> &str {
        &self.new_behavior_tag
    }

    /// Advance the fold by one record at 1-based position `trial_number`
    pub fn transition(
        &self,
        state: CounterState,
        record: &InteractionRecord,
        trial_number: u32,
    ) -> (CounterState, AugmentedRecord) {
        assert!(trial_number >= 1, "trial numbers are 1-based");

        let counter = if trial_number == 1 {
            1
        } else if record.decision_type == self.new_behavior_tag {
            state.counter + 1
        } else {
            state.counter
        };

        let microstate = 1.0 - f64::from(counter) / f64::from(trial_number);
        debug_assert!(counter <= trial_number);
        debug_assert!((0.0..1.0).contains(&microstate));

        let augmented = AugmentedRecord {
            record: record.clone(),
            trial_number,
            running_count: counter,
            microstate,
        };

        (CounterState { counter }, augmented)
    }

    /// Augment one participant's ordered sequence
    pub fn compute_partition(&self, records: &[InteractionRecord]) -> Vec<AugmentedRecord> {
        records
            .iter()
            .zip(1u32..)
            .scan(CounterState::default(), |state, (record, trial_number)| {
                let (next, augmented) = self.transition(*state, record, trial_number);
                *state = next;
                Some(augmented)
            })
            .collect()
    }

    /// Augment a batch holding any number of participants.
    ///
    /// Output order matches input order. The batch is rejected as a whole if
    /// any record lacks a participant id or decision type.
    pub fn compute(
        &self,
        records: &[InteractionRecord],
    ) -> Result<Vec<AugmentedRecord>, ComputeError> {
        validate_records(records)?;

        let partitions = partition_indices(records);
        log::debug!(
            "computing microstates for {} records across {} participants",
            records.len(),
            partitions.len()
        );

        let mut slots: Vec<Option<AugmentedRecord>> = vec![None; records.len()];
        for indices in partitions.values() {
            if indices.windows(2).any(|pair| pair[1] != pair[0] + 1) {
                log::warn!(
                    "participant {} has non-contiguous records; trials follow input order",
                    records[indices[0]].participant_id
                );
            }

            indices
                .iter()
                .zip(1u32..)
                .fold(CounterState::default(), |state, (&index, trial_number)| {
                    let (next, augmented) =
                        self.transition(state, &records[index], trial_number);
                    slots[index] = Some(augmented);
                    next
                });
        }

        let augmented: Vec<AugmentedRecord> = slots.into_iter().flatten().collect();
        assert_eq!(augmented.len(), records.len(), "every record is augmented once");
        Ok(augmented)
    }
}

/// Reject records with an empty participant id or decision type
pub fn validate_records(records: &[InteractionRecord]) -> Result<(), ComputeError> {
    for (index, record) in records.iter().enumerate() {
        if record.participant_id.trim().is_empty() {
            return Err(ComputeError::malformed(index, None, "empty participant id"));
        }
        if record.decision_type.trim().is_empty() {
            return Err(ComputeError::malformed(
                index,
                Some(&record.participant_id),
                "empty decision type",
            ));
        }
    }
    Ok(())
}

/// Record indices per participant, each list in input order
fn partition_indices(records: &[InteractionRecord]) -> HashMap<&str, Vec<usize>> {
    let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        partitions
            .entry(record.participant_id.as_str())
            .or_default()
            .push(index);
    }
    partitions
}
