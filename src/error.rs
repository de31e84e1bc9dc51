//! Error types for microstate computation

use thiserror::Error;

/// Errors that can occur during ingestion, computation or encoding
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed record at index {index}{}: {reason}", participant_suffix(.participant_id))]
    MalformedRecord {
        index: usize,
        participant_id: Option<String>,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    pub(crate) fn malformed(
        index: usize,
        participant_id: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        ComputeError::MalformedRecord {
            index,
            participant_id: participant_id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

fn participant_suffix(participant_id: &Option<String>) -> String {
    match participant_id {
        Some(id) => format!(" (participant {id})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message_names_participant() {
        let err = ComputeError::malformed(4, Some("p-17"), "empty decision type");
        assert_eq!(
            err.to_string(),
            "Malformed record at index 4 (participant p-17): empty decision type"
        );
    }

    #[test]
    fn test_malformed_record_message_without_participant() {
        let err = ComputeError::malformed(0, None, "empty participant id");
        assert_eq!(
            err.to_string(),
            "Malformed record at index 0: empty participant id"
        );
    }
}
