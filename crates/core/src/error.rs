use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Drill-down depth {depth} out of range for {dimensions} dimensions")]
    DepthOutOfRange { depth: usize, dimensions: usize },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Backing store error: {0}")]
    BackingStore(String),

    #[error("Reconciliation mismatch: {0}")]
    ReconciliationMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ReportError {
    /// Validation failures the caller can correct; everything else is a
    /// server-side failure at the transport boundary.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::UnknownDimension(_)
                | ReportError::DepthOutOfRange { .. }
                | ReportError::InvalidDateRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(ReportError::UnknownDimension("foo".into()).is_client_error());
        assert!(ReportError::DepthOutOfRange {
            depth: 3,
            dimensions: 3
        }
        .is_client_error());
        assert!(ReportError::InvalidDateRange("end before start".into()).is_client_error());
        assert!(!ReportError::BackingStore("connection refused".into()).is_client_error());
        assert!(!ReportError::ReconciliationMismatch("depth/key".into()).is_client_error());
    }
}
