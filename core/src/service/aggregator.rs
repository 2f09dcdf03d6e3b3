// Pure over its inputs. The caller hands over the reports of one month.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::report::{DailyReport, MaterialUsageLine};
use crate::model::summary::{MaterialTotal, MonthlySummary, SiteSummary};

const UNKNOWN_SITE_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy)]
struct Observation {
    date: NaiveDate,
    progress: f64,
}

struct SiteAccumulator {
    id: String,
    name: Option<String>,
    total_hours: f64,
    first: Option<Observation>,
    last: Option<Observation>,
}

impl SiteAccumulator {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            total_hours: 0.0,
            first: None,
            last: None,
        }
    }

    fn add(&mut self, report: &DailyReport) {
        if self.name.is_none() {
            self.name = report.site_name.clone().filter(|n| !n.is_empty());
        }
        self.total_hours += report.work_hours();

        if let Some(progress) = report.progress_percentage {
            let seen = Observation {
                date: report.report_date,
                progress,
            };
            // Strict comparisons: on equal dates the earlier input wins.
            if self.first.map_or(true, |f| seen.date < f.date) {
                self.first = Some(seen);
            }
            if self.last.map_or(true, |l| seen.date > l.date) {
                self.last = Some(seen);
            }
        }
    }

    fn progress_change(&self) -> f64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) if last.date > first.date => last.progress - first.progress,
            _ => 0.0,
        }
    }

    fn finish(self) -> SiteSummary {
        let progress_change = self.progress_change();
        SiteSummary {
            id: self.id,
            name: self.name.unwrap_or_else(|| UNKNOWN_SITE_NAME.to_string()),
            total_hours: self.total_hours,
            progress_change,
        }
    }
}

pub fn aggregate(
    year: i32,
    month: u32,
    reports: &[DailyReport],
    materials: &[MaterialUsageLine],
) -> MonthlySummary {
    let mut summary = MonthlySummary::new(year, month);
    summary.total_reports = reports.len();

    let mut site_index: HashMap<&str, usize> = HashMap::new();
    let mut sites: Vec<SiteAccumulator> = Vec::new();
    let mut progress_sum = 0.0;
    let mut progress_count = 0usize;

    for report in reports {
        let idx = *site_index.entry(report.site_id.as_str()).or_insert_with(|| {
            sites.push(SiteAccumulator::new(&report.site_id));
            sites.len() - 1
        });
        sites[idx].add(report);

        if let Some(progress) = report.progress_percentage {
            progress_sum += progress;
            progress_count += 1;
        }
    }

    summary.average_progress = if progress_count > 0 {
        progress_sum / progress_count as f64
    } else {
        0.0
    };

    summary.sites_worked = sites.into_iter().map(SiteAccumulator::finish).collect();
    summary.total_work_hours = summary.sites_worked.iter().map(|s| s.total_hours).sum();
    summary.material_usage = total_materials(materials);
    summary
}

pub fn aggregate_reports(year: i32, month: u32, reports: &[DailyReport]) -> MonthlySummary {
    let materials: Vec<MaterialUsageLine> = reports
        .iter()
        .flat_map(|r| r.materials.iter().cloned())
        .collect();
    aggregate(year, month, reports, &materials)
}

// Exact (material_name, unit) pairs, first-seen order.
pub fn total_materials(materials: &[MaterialUsageLine]) -> Vec<MaterialTotal> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut totals: Vec<MaterialTotal> = Vec::new();

    for line in materials {
        let key = (line.material_name.as_str(), line.unit.as_str());
        match index.get(&key) {
            Some(&i) => totals[i].total_quantity += line.quantity,
            None => {
                index.insert(key, totals.len());
                totals.push(MaterialTotal {
                    material_name: line.material_name.clone(),
                    total_quantity: line.quantity,
                    unit: line.unit.clone(),
                });
            }
        }
    }

    totals
}
