use sitereport_core::{MonthlyReport, MonthlySummary};
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct OverviewRow {
    #[tabled(rename = "Item")]
    item: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct SiteHoursRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Hours")]
    hours: String,
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Change (%)")]
    change: String,
}

#[derive(Tabled)]
struct MaterialRow {
    #[tabled(rename = "Material")]
    name: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

fn styled(mut table: Table) -> Table {
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    table
}

pub fn print_table(report: &MonthlyReport) {
    let summary = &report.summary;
    println!("\n\x1b[1;36m{}-{:02} Monthly Report\x1b[0m", summary.year, summary.month);

    let overview = vec![
        OverviewRow {
            item: "Reports",
            value: summary.total_reports.to_string(),
        },
        OverviewRow {
            item: "Work hours",
            value: format!("{:.1}", summary.total_work_hours),
        },
        OverviewRow {
            item: "Average progress",
            value: format!("{:.1}%", summary.average_progress),
        },
    ];
    println!("{}", styled(Table::new(overview)));

    println!("\nHours by site");
    if summary.sites_worked.is_empty() {
        println!("  No data.");
    } else {
        let rows: Vec<SiteHoursRow> = summary
            .sites_worked
            .iter()
            .map(|s| SiteHoursRow {
                name: s.name.clone(),
                id: s.id.clone(),
                hours: format!("{:.1}", s.total_hours),
            })
            .collect();
        println!("{}", styled(Table::new(rows)));
    }

    println!("\nProgress by site");
    let changes = summary.progress_changes();
    if changes.is_empty() {
        println!("  No progress data.");
    } else {
        let rows: Vec<ProgressRow> = changes
            .iter()
            .map(|s| ProgressRow {
                name: s.name.clone(),
                change: format!("{:+.1}", s.progress_change),
            })
            .collect();
        println!("{}", styled(Table::new(rows)));
    }

    println!("\nMaterial usage");
    if summary.material_usage.is_empty() {
        println!("  No material data.");
    } else {
        let rows: Vec<MaterialRow> = summary
            .material_usage
            .iter()
            .map(|m| MaterialRow {
                name: m.material_name.clone(),
                quantity: format!("{:.2}", m.total_quantity),
                unit: m.unit.clone(),
            })
            .collect();
        println!("{}", styled(Table::new(rows)));
    }

    print_losses(report);
}

pub fn print_losses(report: &MonthlyReport) {
    for loss in &report.losses {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", loss);
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV export in four sections separated by blank lines: overview, hours per
/// site, non-zero progress changes, material totals.
pub fn to_csv(summary: &MonthlySummary) -> String {
    let mut csv = String::from("item,value\n");
    csv.push_str(&format!("period,{}-{:02}\n", summary.year, summary.month));
    csv.push_str(&format!("reports,{}\n", summary.total_reports));
    csv.push_str(&format!("work_hours,{:.1}\n", summary.total_work_hours));
    csv.push_str(&format!("average_progress,{:.1}%\n\n", summary.average_progress));

    csv.push_str("site,work_hours\n");
    for site in &summary.sites_worked {
        csv.push_str(&format!("{},{:.1}\n", csv_field(&site.name), site.total_hours));
    }
    csv.push('\n');

    csv.push_str("site,progress_change\n");
    for site in summary.sites_worked.iter().filter(|s| s.progress_change != 0.0) {
        csv.push_str(&format!("{},{:.1}\n", csv_field(&site.name), site.progress_change));
    }
    csv.push('\n');

    csv.push_str("material,quantity,unit\n");
    for material in &summary.material_usage {
        csv.push_str(&format!(
            "{},{:.2},{}\n",
            csv_field(&material.material_name),
            material.total_quantity,
            csv_field(&material.unit)
        ));
    }
    csv
}
