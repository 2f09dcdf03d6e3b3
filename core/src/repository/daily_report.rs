use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::{debug, warn};

use crate::error::{PartialDataLoss, ReportError, Result};
use crate::model::report::{DailyReport, EquipmentUsage, MaterialUsageLine, WorkerAttendance};
use crate::model::site::Site;
use crate::repository::record::{
    equipment_from_row, material_from_row, report_from_row, site_from_row, worker_from_row,
};
use crate::repository::traits::{RecordFilter, RecordKind, RecordStore, Row};
use crate::time::month_window;

// Dates are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub site_id: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    fn to_record_filter(&self) -> RecordFilter {
        let date_range = match (self.start_date, self.end_date) {
            (None, None) => None,
            (start, end) => Some((start.unwrap_or(NaiveDate::MIN), end.unwrap_or(NaiveDate::MAX))),
        };
        RecordFilter {
            site_id: self.site_id.clone(),
            user_id: self.user_id.clone(),
            date_range,
            ..RecordFilter::default()
        }
    }
}

// Sorted by (report_date, id).
#[derive(Debug, Clone, Default)]
pub struct FetchedReports {
    pub reports: Vec<DailyReport>,
    pub losses: Vec<PartialDataLoss>,
    // Rows dropped as malformed or as a repeat of an id already seen.
    pub rejected: usize,
}

impl FetchedReports {
    pub fn is_degraded(&self) -> bool {
        !self.losses.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FetchedReport {
    pub report: DailyReport,
    pub losses: Vec<PartialDataLoss>,
}

impl FetchedReport {
    pub fn is_degraded(&self) -> bool {
        !self.losses.is_empty()
    }
}

// Rows stored per report in their own record kind.
trait ChildRecord: Sized {
    const KIND: RecordKind;

    fn from_row(row: &Row) -> Result<Self>;
    fn report_id(&self) -> &str;
    fn loss(report_id: String, reason: String) -> PartialDataLoss;
}

impl ChildRecord for MaterialUsageLine {
    const KIND: RecordKind = RecordKind::Materials;

    fn from_row(row: &Row) -> Result<Self> {
        material_from_row(row)
    }

    fn report_id(&self) -> &str {
        &self.report_id
    }

    fn loss(report_id: String, reason: String) -> PartialDataLoss {
        PartialDataLoss::Materials { report_id, reason }
    }
}

impl ChildRecord for EquipmentUsage {
    const KIND: RecordKind = RecordKind::Equipment;

    fn from_row(row: &Row) -> Result<Self> {
        equipment_from_row(row)
    }

    fn report_id(&self) -> &str {
        &self.report_id
    }

    fn loss(report_id: String, reason: String) -> PartialDataLoss {
        PartialDataLoss::Equipment { report_id, reason }
    }
}

impl ChildRecord for WorkerAttendance {
    const KIND: RecordKind = RecordKind::Workers;

    fn from_row(row: &Row) -> Result<Self> {
        worker_from_row(row)
    }

    fn report_id(&self) -> &str {
        &self.report_id
    }

    fn loss(report_id: String, reason: String) -> PartialDataLoss {
        PartialDataLoss::Workers { report_id, reason }
    }
}

pub struct DailyReportRepository<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> DailyReportRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetch_reports_for_month(
        &self,
        year: i32,
        month: u32,
        site_filter: Option<&str>,
    ) -> Result<FetchedReports> {
        let (start, end) = month_window(year, month).ok_or(ReportError::InvalidPeriod { year, month })?;
        let filter = ReportFilter {
            site_id: site_filter.map(str::to_string),
            user_id: None,
            start_date: Some(start),
            end_date: Some(end),
        };
        self.fetch_reports(&filter)
    }

    pub fn fetch_reports(&self, filter: &ReportFilter) -> Result<FetchedReports> {
        let rows = self.store.query_records(RecordKind::Reports, &filter.to_record_filter())?;
        debug!("fetched {} report rows", rows.len());

        let mut fetched = FetchedReports::default();
        let mut seen = HashSet::new();
        for row in &rows {
            match report_from_row(row) {
                Ok(report) if seen.insert(report.id.clone()) => fetched.reports.push(report),
                Ok(report) => {
                    warn!("skipping duplicate report row {}", report.id);
                    fetched.rejected += 1;
                }
                Err(e) => {
                    warn!("skipping report row: {}", e);
                    fetched.rejected += 1;
                }
            }
        }

        if fetched.reports.is_empty() {
            return Ok(fetched);
        }

        self.attach_sub_records(&mut fetched.reports, &mut fetched.losses);
        self.attach_site_names(&mut fetched.reports, &mut fetched.losses);

        fetched
            .reports
            .sort_by(|a, b| a.report_date.cmp(&b.report_date).then_with(|| a.id.cmp(&b.id)));
        Ok(fetched)
    }

    pub fn fetch_report(&self, id: &str) -> Result<FetchedReport> {
        let filter = RecordFilter::for_reports(vec![id.to_string()]);
        let rows = self.store.query_records(RecordKind::Reports, &filter)?;
        if rows.len() > 1 {
            warn!("{} rows stored for report {}, using the first", rows.len(), id);
        }
        let row = rows.first().ok_or_else(|| ReportError::NotFound { id: id.to_string() })?;
        let report = report_from_row(row)?;

        let mut losses = Vec::new();
        let mut reports = vec![report];
        self.attach_sub_records(&mut reports, &mut losses);
        self.attach_site_names(&mut reports, &mut losses);

        match reports.pop() {
            Some(report) => Ok(FetchedReport { report, losses }),
            None => Err(ReportError::NotFound { id: id.to_string() }),
        }
    }

    pub fn list_sites(&self) -> Result<Vec<Site>> {
        let rows = self.store.query_records(RecordKind::Sites, &RecordFilter::default())?;
        let mut sites: Vec<Site> = rows
            .iter()
            .filter_map(|row| match site_from_row(row) {
                Ok(site) => Some(site),
                Err(e) => {
                    warn!("skipping site row: {}", e);
                    None
                }
            })
            .collect();
        sites.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(sites)
    }

    fn attach_sub_records(&self, reports: &mut [DailyReport], losses: &mut Vec<PartialDataLoss>) {
        let ids: Vec<String> = reports.iter().map(|r| r.id.clone()).collect();

        let mut materials = self.fetch_children::<MaterialUsageLine>(&ids, losses);
        let mut equipment = self.fetch_children::<EquipmentUsage>(&ids, losses);
        let mut workers = self.fetch_children::<WorkerAttendance>(&ids, losses);

        for report in reports.iter_mut() {
            report.materials = materials.remove(&report.id).unwrap_or_default();
            report.equipment = equipment.remove(&report.id).unwrap_or_default();
            report.workers = workers.remove(&report.id).unwrap_or_default();
        }
    }

    // One batched query keyed by report ids. If it fails, each report is
    // fetched on its own so a single bad report cannot blank the month.
    fn fetch_children<T: ChildRecord>(
        &self,
        ids: &[String],
        losses: &mut Vec<PartialDataLoss>,
    ) -> HashMap<String, Vec<T>> {
        let mut by_report: HashMap<String, Vec<T>> = HashMap::new();
        let kind = T::KIND.as_str();

        match self.store.query_records(T::KIND, &RecordFilter::for_reports(ids.to_vec())) {
            Ok(rows) => group_children(&rows, &mut by_report, losses),
            Err(e) => {
                warn!("batched {} fetch failed, fetching per report: {}", kind, e);
                for id in ids {
                    let filter = RecordFilter::for_reports(vec![id.clone()]);
                    match self.store.query_records(T::KIND, &filter) {
                        Ok(rows) => group_children(&rows, &mut by_report, losses),
                        Err(e) => {
                            warn!("{} for report {} unavailable: {}", kind, id, e);
                            losses.push(T::loss(id.clone(), e.to_string()));
                        }
                    }
                }
            }
        }

        by_report
    }

    fn attach_site_names(&self, reports: &mut [DailyReport], losses: &mut Vec<PartialDataLoss>) {
        let mut site_ids: Vec<String> = Vec::new();
        for report in reports.iter() {
            if !site_ids.contains(&report.site_id) {
                site_ids.push(report.site_id.clone());
            }
        }

        let filter = RecordFilter {
            site_ids: Some(site_ids),
            ..RecordFilter::default()
        };
        let rows = match self.store.query_records(RecordKind::Sites, &filter) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("site names unavailable: {}", e);
                losses.push(PartialDataLoss::SiteNames { reason: e.to_string() });
                return;
            }
        };

        let names: HashMap<String, String> = rows
            .iter()
            .filter_map(|row| site_from_row(row).ok())
            .map(|site| (site.id, site.name))
            .collect();
        for report in reports.iter_mut() {
            if let Some(name) = names.get(&report.site_id) {
                report.site_name = Some(name.clone());
            }
        }
    }
}

fn group_children<T: ChildRecord>(
    rows: &[Row],
    by_report: &mut HashMap<String, Vec<T>>,
    losses: &mut Vec<PartialDataLoss>,
) {
    for row in rows {
        match T::from_row(row) {
            Ok(child) => by_report.entry(child.report_id().to_string()).or_default().push(child),
            Err(e) => {
                let report_id = row
                    .get("report_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                warn!("skipping {} row: {}", T::KIND.as_str(), e);
                losses.push(T::loss(report_id, e.to_string()));
            }
        }
    }
}
