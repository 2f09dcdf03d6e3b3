mod reports;
mod summary;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use sitereport_core::time::{parse_report_date, parse_time_of_day};
use sitereport_core::{
    current_month, expand_key, parse_args, parse_equipment, parse_material, parse_worker, DailyReport,
    FileRecordStore, IssueStatus, MonthlySummaryService, ReportFilter, SafetyChecks, Site, WeatherType,
};

#[derive(Parser)]
#[command(name = "sitereport")]
#[command(about = "Construction site daily reports and monthly summaries", long_about = None)]
struct Cli {
    /// Directory holding the JSON record files (default: ~/.sitereport)
    #[arg(long, global = true, env = "SITEREPORT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Monthly summary (defaults to the current month)
    Summary {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// List construction sites
    Sites,
    /// Register a site (usage: add-site S1 North Tower)
    AddSite {
        id: String,
        #[arg(trailing_var_arg = true, required = true)]
        name: Vec<String>,
    },
    /// List reports (usage: reports site:S1 from:2024-06-01 to:2024-06-30)
    Reports {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show one report with its materials, equipment and workers
    Report { id: String },
    /// Add a daily report (usage: add site:S1 date:2024-06-01 start:08:00 end:17:00 progress:10 material:砂利=2.5t worker:田中=8)
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

const REPORT_KEYS: [&str; 17] = [
    "site",
    "date",
    "start",
    "end",
    "manpower",
    "progress",
    "user",
    "material",
    "equipment",
    "worker",
    "weather",
    "temperature",
    "description",
    "issues",
    "status",
    "next",
    "safety",
];
const SAFETY_KEYS: [&str; 5] = ["meeting", "gear", "risk", "clean", "tools"];
const FILTER_KEYS: [&str; 4] = ["site", "user", "from", "to"];

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let store = FileRecordStore::new(cli.data_dir)?;
    log::debug!("using data directory {}", store.base_dir().display());

    match cli.command {
        Some(Commands::Summary { year, month, format }) => {
            let (this_year, this_month) = current_month();
            show_summary(&store, year.unwrap_or(this_year), month.unwrap_or(this_month), format)?;
        }
        Some(Commands::Sites) => {
            let service = MonthlySummaryService::new(&store);
            reports::show_sites(&service.list_sites()?);
        }
        Some(Commands::AddSite { id, name }) => {
            let site = Site::new(id, name.join(" "));
            store.insert_site(&site)?;
            println!("Site saved: {} ({})", site.name, site.id);
        }
        Some(Commands::Reports { args }) => {
            let filter = parse_filter(&args)?;
            let service = MonthlySummaryService::new(&store);
            reports::show_reports(&service.list_reports(&filter)?);
        }
        Some(Commands::Report { id }) => {
            let service = MonthlySummaryService::new(&store);
            reports::show_report(&service.get_report(&id)?);
        }
        Some(Commands::Add { args }) => {
            let report = parse_report(&args)?;
            let created = store.create_report(report)?;
            println!("Report added: {} (ID: {})", created.report_date, created.id);
            println!("  Site: {}", created.site_id);
            if created.work_start_time.is_some() && created.work_end_time.is_some() {
                println!("  Hours: {:.1}", created.work_hours());
            }
            for m in &created.materials {
                println!("  Material: {} {} {}", m.material_name, m.quantity, m.unit);
            }
            for e in &created.equipment {
                println!("  Equipment: {}", e.equipment_name);
            }
            for w in &created.workers {
                println!("  Worker: {}", w.worker_name);
            }
        }
        None => {
            let (year, month) = current_month();
            show_summary(&store, year, month, Format::Table)?;
        }
    }
    Ok(())
}

fn show_summary(store: &FileRecordStore, year: i32, month: u32, format: Format) -> Result<()> {
    let service = MonthlySummaryService::new(store);
    let report = service.get_monthly_summary(year, month)?;
    match format {
        Format::Table => summary::print_table(&report),
        Format::Csv => {
            print!("{}", summary::to_csv(&report.summary));
            summary::print_losses(&report);
        }
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&report.summary)?);
            summary::print_losses(&report);
        }
    }
    Ok(())
}

fn expanded_fields(args: &[String], known_keys: &[&str]) -> Result<Vec<(String, String)>> {
    let parsed = parse_args(args);
    if !parsed.name.is_empty() {
        return Err(anyhow!("Unexpected argument: '{}' (expected key:value)", parsed.name));
    }
    parsed
        .metadata
        .into_iter()
        .map(|(key, value)| Ok((expand_key(&key, known_keys)?, value)))
        .collect()
}

fn parse_filter(args: &[String]) -> Result<ReportFilter> {
    let mut filter = ReportFilter::default();
    for (key, value) in expanded_fields(args, &FILTER_KEYS)? {
        match key.as_str() {
            "site" => filter.site_id = Some(value),
            "user" => filter.user_id = Some(value),
            "from" => filter.start_date = Some(parse_report_date(&value)?),
            "to" => filter.end_date = Some(parse_report_date(&value)?),
            _ => unreachable!("expand_key only returns known keys"),
        }
    }
    Ok(filter)
}

fn parse_safety(value: &str) -> Result<SafetyChecks> {
    let mut checks = SafetyChecks::default();
    for item in value.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        if item == "all" {
            checks.morning_meeting = true;
            checks.safety_equipment = true;
            checks.risk_assessment = true;
            checks.site_clean = true;
            checks.tools_inspection = true;
            continue;
        }
        match expand_key(item, &SAFETY_KEYS)?.as_str() {
            "meeting" => checks.morning_meeting = true,
            "gear" => checks.safety_equipment = true,
            "risk" => checks.risk_assessment = true,
            "clean" => checks.site_clean = true,
            "tools" => checks.tools_inspection = true,
            _ => unreachable!("expand_key only returns known keys"),
        }
    }
    Ok(checks)
}

fn append_text(target: &mut String, value: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(value);
}

fn parse_report(args: &[String]) -> Result<DailyReport> {
    let fields = expanded_fields(args, &REPORT_KEYS)?;

    let site_id = fields
        .iter()
        .find(|(k, _)| k == "site")
        .map(|(_, v)| v.clone())
        .ok_or_else(|| anyhow!("site:<id> is required"))?;
    let date = match fields.iter().find(|(k, _)| k == "date") {
        Some((_, v)) => parse_report_date(v)?,
        None => Local::now().date_naive(),
    };

    let mut report = DailyReport::new("", site_id, date);

    for (key, value) in fields {
        match key.as_str() {
            "site" | "date" => {}
            "start" => {
                report.work_start_time =
                    Some(parse_time_of_day(&value).ok_or_else(|| anyhow!("Invalid start time: '{}'", value))?)
            }
            "end" => {
                report.work_end_time =
                    Some(parse_time_of_day(&value).ok_or_else(|| anyhow!("Invalid end time: '{}'", value))?)
            }
            "manpower" => {
                report.manpower = Some(value.parse().map_err(|_| anyhow!("Invalid manpower: '{}'", value))?)
            }
            "progress" => {
                let progress: f64 = value.parse().map_err(|_| anyhow!("Invalid progress: '{}'", value))?;
                if !(0.0..=100.0).contains(&progress) {
                    return Err(anyhow!("Progress must be between 0 and 100: {}", progress));
                }
                report.progress_percentage = Some(progress);
            }
            "user" => report.user_id = Some(value),
            "material" => report.materials.push(parse_material(&value)?),
            "equipment" => report.equipment.push(parse_equipment(&value)?),
            "worker" => report.workers.push(parse_worker(&value)?),
            "weather" => match WeatherType::parse(&value) {
                Some(kind) => report.weather_type = Some(kind),
                None => report.weather = Some(value),
            },
            "temperature" => {
                report.temperature = Some(value.parse().map_err(|_| anyhow!("Invalid temperature: '{}'", value))?)
            }
            "description" => append_text(&mut report.work_description, &value),
            "issues" => append_text(report.issues.get_or_insert_with(String::new), &value),
            "status" => {
                report.issue_status = IssueStatus::parse(&value)
                    .ok_or_else(|| anyhow!("Invalid issue status: '{}' (none, pending, resolved)", value))?
            }
            "next" => append_text(report.next_day_plan.get_or_insert_with(String::new), &value),
            "safety" => report.safety_checks = Some(parse_safety(&value)?),
            _ => unreachable!("expand_key only returns known keys"),
        }
    }

    if report.issues.is_some() && report.issue_status == IssueStatus::None {
        report.issue_status = IssueStatus::Pending;
    }

    if let (Some(start), Some(end)) = (report.work_start_time, report.work_end_time) {
        if end < start {
            log::warn!("end time {} is before start time {}; counted as 0 hours", end, start);
        }
    }

    Ok(report)
}
