use sitereport_core::{DailyReport, FetchedReport, FetchedReports, IssueStatus, Site};
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Crew")]
    manpower: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Materials")]
    materials: String,
}

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn report_row(report: &DailyReport) -> ReportRow {
    let materials = report
        .materials
        .iter()
        .map(|m| format!("{} {}{}", m.material_name, m.quantity, m.unit))
        .collect::<Vec<_>>()
        .join("\n");

    ReportRow {
        date: report.report_date.format("%Y-%m-%d (%a)").to_string(),
        id: short_id(&report.id),
        site: report.site_name.clone().unwrap_or_else(|| report.site_id.clone()),
        hours: match (report.work_start_time, report.work_end_time) {
            (Some(start), Some(end)) => format!(
                "{}-{} ({:.1}h)",
                start.format("%H:%M"),
                end.format("%H:%M"),
                report.work_hours()
            ),
            _ => "-".to_string(),
        },
        manpower: report.manpower.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
        progress: report
            .progress_percentage
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "-".to_string()),
        materials,
    }
}

pub fn show_reports(fetched: &FetchedReports) {
    if fetched.reports.is_empty() {
        println!("No reports found.");
    } else {
        let rows: Vec<ReportRow> = fetched.reports.iter().map(report_row).collect();
        let mut table = Table::new(rows);
        table
            .with(Style::modern())
            .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
        println!("{}", table);
    }

    if fetched.rejected > 0 {
        eprintln!(
            "\x1b[33mWarning:\x1b[0m {} report rows skipped (malformed or duplicate)",
            fetched.rejected
        );
    }
    for loss in &fetched.losses {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", loss);
    }
}

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct EquipmentRow {
    #[tabled(rename = "Equipment")]
    name: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "Operator")]
    operator: String,
}

#[derive(Tabled)]
struct WorkerRow {
    #[tabled(rename = "Worker")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Hours")]
    hours: String,
}

fn or_dash(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_else(|| "-".to_string())
}

fn hours_text(hours: Option<f64>) -> String {
    hours.map(|h| format!("{:.1}", h)).unwrap_or_else(|| "-".to_string())
}

fn detail_rows(report: &DailyReport) -> Vec<DetailRow> {
    let base = report_row(report);
    let weather = match (report.weather_type, report.weather.as_deref()) {
        (Some(kind), Some(text)) => format!("{} ({})", kind.as_str(), text),
        (Some(kind), None) => kind.as_str().to_string(),
        (None, text) => or_dash(text),
    };
    let issues = match (report.issues.as_deref(), report.issue_status) {
        (Some(text), status) => format!("{} [{}]", text, status.as_str()),
        (None, IssueStatus::None) => "-".to_string(),
        (None, status) => status.as_str().to_string(),
    };
    let safety = match &report.safety_checks {
        Some(checks) => {
            let done = [
                (checks.morning_meeting, "meeting"),
                (checks.safety_equipment, "gear"),
                (checks.risk_assessment, "risk"),
                (checks.site_clean, "clean"),
                (checks.tools_inspection, "tools"),
            ];
            let mut text = done
                .iter()
                .filter(|(ok, _)| *ok)
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            if checks.all_done() {
                text = "all".to_string();
            }
            if let Some(notes) = &checks.additional_notes {
                text = format!("{} / {}", text, notes);
            }
            text
        }
        None => "-".to_string(),
    };

    let rows = [
        ("ID", report.id.clone()),
        ("Date", base.date),
        ("Site", base.site),
        ("User", or_dash(report.user_id.as_deref())),
        ("Weather", weather),
        (
            "Temperature",
            report
                .temperature
                .map(|t| format!("{:.1}°C", t))
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Hours", base.hours),
        ("Crew", base.manpower),
        ("Progress", base.progress),
        ("Work", or_dash(Some(report.work_description.as_str()).filter(|d| !d.is_empty()))),
        ("Issues", issues),
        ("Next day", or_dash(report.next_day_plan.as_deref())),
        ("Safety", safety),
        ("Materials", if base.materials.is_empty() { "-".to_string() } else { base.materials }),
    ];
    rows.into_iter()
        .map(|(field, value)| DetailRow {
            field: field.to_string(),
            value,
        })
        .collect()
}

pub fn show_report(fetched: &FetchedReport) {
    let report = &fetched.report;
    let mut table = Table::new(detail_rows(report));
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);

    if !report.equipment.is_empty() {
        let rows: Vec<EquipmentRow> = report
            .equipment
            .iter()
            .map(|e| EquipmentRow {
                name: e.equipment_name.clone(),
                hours: hours_text(e.usage_hours),
                operator: or_dash(e.operator.as_deref()),
            })
            .collect();
        let mut table = Table::new(rows);
        table
            .with(Style::modern())
            .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
        println!("{}", table);
    }

    if !report.workers.is_empty() {
        let rows: Vec<WorkerRow> = report
            .workers
            .iter()
            .map(|w| WorkerRow {
                name: w.worker_name.clone(),
                role: or_dash(w.role.as_deref()),
                hours: hours_text(w.hours_worked),
            })
            .collect();
        let mut table = Table::new(rows);
        table
            .with(Style::modern())
            .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
        println!("{}", table);
    }

    for loss in &fetched.losses {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", loss);
    }
}

pub fn show_sites(sites: &[Site]) {
    if sites.is_empty() {
        println!("No sites found.");
        return;
    }
    let rows: Vec<SiteRow> = sites
        .iter()
        .map(|s| SiteRow {
            id: s.id.clone(),
            name: s.name.clone(),
            status: format!("{:?}", s.status),
        })
        .collect();
    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sitereport_core::{SafetyChecks, WeatherType};

    fn value_of<'a>(rows: &'a [DetailRow], field: &str) -> &'a str {
        rows.iter()
            .find(|r| r.field == field)
            .map(|r| r.value.as_str())
            .unwrap()
    }

    #[test]
    fn test_detail_rows() {
        let mut report = DailyReport::new("r1", "S1", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        report.site_name = Some("北棟".to_string());
        report.weather_type = Some(WeatherType::Cloudy);
        report.weather = Some("午後から雨".to_string());
        report.issues = Some("生コン遅延".to_string());
        report.issue_status = IssueStatus::Pending;
        report.safety_checks = Some(SafetyChecks {
            morning_meeting: true,
            site_clean: true,
            ..SafetyChecks::default()
        });

        let rows = detail_rows(&report);
        assert_eq!(value_of(&rows, "Site"), "北棟");
        assert_eq!(value_of(&rows, "Weather"), "cloudy (午後から雨)");
        assert_eq!(value_of(&rows, "Issues"), "生コン遅延 [pending]");
        assert_eq!(value_of(&rows, "Safety"), "meeting, clean");
        assert_eq!(value_of(&rows, "Work"), "-");
        assert_eq!(value_of(&rows, "Materials"), "-");
    }
}
