use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("Unparseable file: {0}")]
    UnparseableFile(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analyzer '{stage}' failed: {message}")]
    Analyzer { stage: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    pub fn analyzer(stage: &str, message: impl Into<String>) -> Self {
        Self::Analyzer {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Structural errors abort the whole run; everything else is
    /// recoverable at an analyzer boundary.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredColumns(_) | Self::UnparseableFile(_) | Self::EmptyDataset(_)
        )
    }

    /// Stable machine-readable label for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredColumns(_) => "missing_required_columns",
            Self::UnparseableFile(_) => "unparseable_file",
            Self::EmptyDataset(_) => "empty_dataset",
            Self::Config(_) => "configuration_error",
            Self::Analyzer { .. } => "analyzer_failed",
            Self::Csv(_) => "csv_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_fields() {
        let err = CampaignError::MissingRequiredColumns(vec![
            "clicks".to_string(),
            "cost".to_string(),
        ]);
        assert_eq!(err.to_string(), "Missing required columns: clicks, cost");
        assert!(err.is_structural());
        assert_eq!(err.code(), "missing_required_columns");
    }

    #[test]
    fn test_analyzer_error_is_recoverable() {
        let err = CampaignError::analyzer("market_insights", "bad pattern");
        assert_eq!(
            err.to_string(),
            "Analyzer 'market_insights' failed: bad pattern"
        );
        assert!(!err.is_structural());
    }
}
