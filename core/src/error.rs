use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store: I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store: unreachable: {0}")]
    Unreachable(String),

    #[error("Store: conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    // Not retried here; retry policy belongs to the store.
    #[error("report data unavailable: {source}")]
    DataUnavailable {
        #[source]
        source: StoreError,
    },

    #[error("invalid period {year}-{month:02}: month must be within 1..=12")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: &'static str, reason: String },

    #[error("report {id} not found")]
    NotFound { id: String },
}

impl From<StoreError> for ReportError {
    fn from(source: StoreError) -> Self {
        ReportError::DataUnavailable { source }
    }
}

// A sub-fetch failed while its parent fetch succeeded. The affected data is
// left empty instead of failing the whole fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartialDataLoss {
    #[error("materials for report {report_id} unavailable: {reason}")]
    Materials { report_id: String, reason: String },

    #[error("equipment for report {report_id} unavailable: {reason}")]
    Equipment { report_id: String, reason: String },

    #[error("workers for report {report_id} unavailable: {reason}")]
    Workers { report_id: String, reason: String },

    #[error("site names unavailable: {reason}")]
    SiteNames { reason: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;
