pub mod daily_report;
pub mod file;
pub mod record;
pub mod traits;

// Re-export
pub use daily_report::{DailyReportRepository, FetchedReport, FetchedReports, ReportFilter};
pub use file::FileRecordStore;
pub use traits::{RecordFilter, RecordKind, RecordStore, Row};
