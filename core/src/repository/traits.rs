use chrono::NaiveDate;

use crate::error::StoreError;

// Typed mapping happens in the report repository.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Sites,
    Reports,
    Materials,
    Equipment,
    Workers,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Sites => "sites",
            RecordKind::Reports => "reports",
            RecordKind::Materials => "materials",
            RecordKind::Equipment => "equipment",
            RecordKind::Workers => "workers",
        }
    }
}

// Unset fields do not constrain the result. date_range is inclusive and
// applies to report_date. For reports, report_ids matches the row id; for
// child records it matches report_id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub site_id: Option<String>,
    pub site_ids: Option<Vec<String>>,
    pub user_id: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub report_ids: Option<Vec<String>>,
}

impl RecordFilter {
    pub fn for_reports(report_ids: Vec<String>) -> Self {
        Self {
            report_ids: Some(report_ids),
            ..Self::default()
        }
    }
}

pub trait RecordStore {
    fn query_records(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Row>, StoreError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn query_records(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Row>, StoreError> {
        (**self).query_records(kind, filter)
    }
}
