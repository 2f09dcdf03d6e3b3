pub mod error;
pub mod input;
pub mod model;
pub mod repository;
pub mod service;
pub mod time;

pub use error::{PartialDataLoss, ReportError, StoreError};
pub use input::{expand_key, parse_args, parse_equipment, parse_material, parse_worker, ParsedInput};
pub use model::report::{
    DailyReport, EquipmentUsage, IssueStatus, MaterialUsageLine, SafetyChecks, WeatherType, WorkerAttendance,
};
pub use model::site::{Site, SiteStatus};
pub use model::summary::{MaterialTotal, MonthlySummary, SiteSummary};
pub use repository::{
    DailyReportRepository, FetchedReport, FetchedReports, FileRecordStore, RecordStore, ReportFilter,
};
pub use service::aggregator::{aggregate, aggregate_reports};
pub use service::summary_service::{MonthlyReport, MonthlySummaryService};
pub use time::{current_month, month_window};
