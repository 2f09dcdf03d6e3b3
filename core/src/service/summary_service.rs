use log::{info, warn};

use crate::error::{PartialDataLoss, Result};
use crate::model::site::Site;
use crate::model::summary::MonthlySummary;
use crate::repository::daily_report::{DailyReportRepository, FetchedReport, FetchedReports, ReportFilter};
use crate::repository::RecordStore;
use crate::service::aggregator::aggregate_reports;

// A computed summary plus the sub-fetches that failed while loading it.
#[derive(Debug, Clone)]
pub struct MonthlyReport {
    pub summary: MonthlySummary,
    pub losses: Vec<PartialDataLoss>,
}

impl MonthlyReport {
    pub fn is_degraded(&self) -> bool {
        !self.losses.is_empty()
    }
}

pub struct MonthlySummaryService<S: RecordStore> {
    repo: DailyReportRepository<S>,
}

impl<S: RecordStore> MonthlySummaryService<S> {
    pub fn new(store: S) -> Self {
        Self {
            repo: DailyReportRepository::new(store),
        }
    }

    pub fn repository(&self) -> &DailyReportRepository<S> {
        &self.repo
    }

    pub fn get_monthly_summary(&self, year: i32, month: u32) -> Result<MonthlyReport> {
        let fetched = self.repo.fetch_reports_for_month(year, month, None)?;
        if fetched.is_degraded() {
            warn!(
                "summary for {}-{:02} computed with {} partial data losses",
                year,
                month,
                fetched.losses.len()
            );
        }

        let summary = aggregate_reports(year, month, &fetched.reports);
        info!(
            "summary for {}-{:02}: {} reports over {} sites",
            year,
            month,
            summary.total_reports,
            summary.sites_worked.len()
        );

        Ok(MonthlyReport {
            summary,
            losses: fetched.losses,
        })
    }

    pub fn list_sites(&self) -> Result<Vec<Site>> {
        self.repo.list_sites()
    }

    // Newest first. Aggregation keeps the repository's ascending order.
    pub fn list_reports(&self, filter: &ReportFilter) -> Result<FetchedReports> {
        let mut fetched = self.repo.fetch_reports(filter)?;
        fetched.reports.reverse();
        Ok(fetched)
    }

    pub fn get_report(&self, id: &str) -> Result<FetchedReport> {
        let fetched = self.repo.fetch_report(id)?;
        if fetched.is_degraded() {
            warn!("report {} loaded with {} partial data losses", id, fetched.losses.len());
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::model::report::{DailyReport, EquipmentUsage, MaterialUsageLine, WorkerAttendance};
    use crate::repository::FileRecordStore;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::TempDir;

    fn seeded_store(dir: &TempDir) -> FileRecordStore {
        let store = FileRecordStore::new(Some(dir.path().to_path_buf())).unwrap();
        store.insert_site(&Site::new("S1", "北棟")).unwrap();

        for (id, day, progress, qty) in [("r1", 1, 10.0, 15.5), ("r2", 2, 15.0, 4.5)] {
            let mut report = DailyReport::new(id, "S1", NaiveDate::from_ymd_opt(2024, 6, day).unwrap());
            report.work_start_time = NaiveTime::from_hms_opt(8, 0, 0);
            report.work_end_time = NaiveTime::from_hms_opt(17, 0, 0);
            report.progress_percentage = Some(progress);
            report.materials.push(MaterialUsageLine::new("", "コンクリート", qty, "m³"));
            store.create_report(report).unwrap();
        }

        // Outside the window.
        let mut early = DailyReport::new("r0", "S1", NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        early.materials.push(MaterialUsageLine::new("", "コンクリート", 99.0, "m³"));
        store.create_report(early).unwrap();
        store
    }

    #[test]
    fn test_monthly_summary_end_to_end() {
        let dir = TempDir::new().unwrap();
        let service = MonthlySummaryService::new(seeded_store(&dir));

        let report = service.get_monthly_summary(2024, 6).unwrap();
        assert!(!report.is_degraded());

        let summary = report.summary;
        assert_eq!(summary.total_reports, 2);
        assert_eq!(summary.total_work_hours, 18.0);
        assert_eq!(summary.average_progress, 12.5);
        assert_eq!(summary.sites_worked.len(), 1);
        assert_eq!(summary.sites_worked[0].name, "北棟");
        assert_eq!(summary.sites_worked[0].progress_change, 5.0);
        assert_eq!(summary.material_usage.len(), 1);
        assert_eq!(summary.material_usage[0].total_quantity, 20.0);
    }

    #[test]
    fn test_month_without_reports_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let service = MonthlySummaryService::new(seeded_store(&dir));
        let report = service.get_monthly_summary(2024, 2).unwrap();
        assert_eq!(report.summary, MonthlySummary::new(2024, 2));
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let dir = TempDir::new().unwrap();
        let service = MonthlySummaryService::new(seeded_store(&dir));
        assert!(matches!(
            service.get_monthly_summary(2024, 0),
            Err(ReportError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_list_reports_by_site() {
        let dir = TempDir::new().unwrap();
        let service = MonthlySummaryService::new(seeded_store(&dir));
        let filter = ReportFilter {
            site_id: Some("S1".to_string()),
            ..ReportFilter::default()
        };
        let fetched = service.list_reports(&filter).unwrap();
        let ids: Vec<&str> = fetched.reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1", "r0"]);
        assert_eq!(service.list_sites().unwrap().len(), 1);
    }

    #[test]
    fn test_get_report_with_sub_records() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);
        let mut report = DailyReport::new("r5", "S1", NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
        report.work_description = "型枠解体".to_string();
        report.equipment.push(EquipmentUsage::new("", "クレーン", Some(3.0)));
        report.workers.push(WorkerAttendance::new("", "田中", Some(8.0)));
        store.create_report(report).unwrap();

        let service = MonthlySummaryService::new(store);
        let fetched = service.get_report("r5").unwrap();
        assert_eq!(fetched.report.site_name.as_deref(), Some("北棟"));
        assert_eq!(fetched.report.work_description, "型枠解体");
        assert_eq!(fetched.report.equipment[0].report_id, "r5");
        assert_eq!(fetched.report.workers[0].worker_name, "田中");

        assert!(matches!(service.get_report("missing"), Err(ReportError::NotFound { .. })));
    }
}
