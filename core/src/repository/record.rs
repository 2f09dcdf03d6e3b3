// Rows missing a required field are rejected. Optional fields that are
// missing or malformed become None.

use log::debug;
use serde_json::{json, Value};

use crate::error::ReportError;
use crate::model::report::{
    DailyReport, EquipmentUsage, IssueStatus, MaterialUsageLine, SafetyChecks, WeatherType, WorkerAttendance,
};
use crate::model::site::Site;
use crate::repository::traits::Row;
use crate::time::{parse_report_date, parse_time_of_day};

fn invalid(kind: &'static str, reason: impl Into<String>) -> ReportError {
    ReportError::InvalidRecord {
        kind,
        reason: reason.into(),
    }
}

fn str_field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// Accepts numbers and numeric strings, since form submissions often arrive as text.
fn f64_field(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn hours_field(row: &Row, key: &str) -> Option<f64> {
    f64_field(row, key).filter(|h| h.is_finite() && *h >= 0.0)
}

fn string_field(row: &Row, key: &str) -> Option<String> {
    str_field(row, key).map(str::to_string)
}

fn required<'a>(row: &'a Row, kind: &'static str, key: &str) -> Result<&'a str, ReportError> {
    str_field(row, key).ok_or_else(|| invalid(kind, format!("missing {}", key)))
}

pub fn report_from_row(row: &Row) -> Result<DailyReport, ReportError> {
    let id = required(row, "report", "id")?;
    let site_id = required(row, "report", "site_id")
        .map_err(|_| invalid("report", format!("report {} has no site_id", id)))?;
    let date_str = required(row, "report", "report_date")?;
    let report_date = parse_report_date(date_str)
        .map_err(|e| invalid("report", format!("report {}: {}", id, e)))?;

    let mut report = DailyReport::new(id, site_id, report_date);
    report.user_id = str_field(row, "user_id").map(str::to_string);
    report.site_name = str_field(row, "site_name").map(str::to_string);
    report.work_start_time = time_field(row, id, "work_start_time");
    report.work_end_time = time_field(row, id, "work_end_time");

    report.manpower = match f64_field(row, "manpower") {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Some(n as u32),
        Some(n) => {
            debug!("report {}: ignoring manpower {}", id, n);
            None
        }
        None => None,
    };

    report.progress_percentage = match f64_field(row, "progress_percentage") {
        Some(p) if (0.0..=100.0).contains(&p) => Some(p),
        Some(p) => {
            debug!("report {}: ignoring progress_percentage {}", id, p);
            None
        }
        None => None,
    };

    report.weather_type = str_field(row, "weather_type").and_then(|w| {
        let parsed = WeatherType::parse(w);
        if parsed.is_none() {
            debug!("report {}: ignoring weather_type {:?}", id, w);
        }
        parsed
    });
    report.weather = string_field(row, "weather");
    report.temperature = f64_field(row, "temperature").filter(|t| t.is_finite());
    report.work_description = string_field(row, "work_description").unwrap_or_default();
    report.issues = string_field(row, "issues");
    report.issue_status = str_field(row, "issue_status")
        .and_then(IssueStatus::parse)
        .unwrap_or_default();
    report.next_day_plan = string_field(row, "next_day_plan");
    report.safety_checks = match row.get("safety_checks") {
        Some(Value::Null) | None => None,
        Some(value) => match serde_json::from_value::<SafetyChecks>(value.clone()) {
            Ok(checks) => Some(checks),
            Err(e) => {
                debug!("report {}: ignoring safety_checks: {}", id, e);
                None
            }
        },
    };

    Ok(report)
}

fn time_field(row: &Row, id: &str, key: &str) -> Option<chrono::NaiveTime> {
    let raw = str_field(row, key)?;
    let parsed = parse_time_of_day(raw);
    if parsed.is_none() {
        debug!("report {}: ignoring {} {:?}", id, key, raw);
    }
    parsed
}

pub fn material_from_row(row: &Row) -> Result<MaterialUsageLine, ReportError> {
    let report_id = required(row, "material", "report_id")?;
    // Names and units are compared verbatim, so they are not trimmed.
    let material_name = row
        .get("material_name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("material", format!("report {}: missing material_name", report_id)))?;
    let unit = row
        .get("unit")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("material", format!("report {}: missing unit", report_id)))?;
    let quantity = f64_field(row, "quantity")
        .filter(|q| q.is_finite() && *q >= 0.0)
        .ok_or_else(|| invalid("material", format!("report {}: bad quantity for {}", report_id, material_name)))?;

    Ok(MaterialUsageLine::new(report_id, material_name, quantity, unit))
}

pub fn equipment_from_row(row: &Row) -> Result<EquipmentUsage, ReportError> {
    let report_id = required(row, "equipment", "report_id")?;
    let name = required(row, "equipment", "equipment_name")
        .map_err(|_| invalid("equipment", format!("report {}: missing equipment_name", report_id)))?;

    let mut usage = EquipmentUsage::new(report_id, name, hours_field(row, "usage_hours"));
    usage.operator = string_field(row, "operator");
    usage.notes = string_field(row, "notes");
    Ok(usage)
}

pub fn worker_from_row(row: &Row) -> Result<WorkerAttendance, ReportError> {
    let report_id = required(row, "worker", "report_id")?;
    let name = required(row, "worker", "worker_name")
        .map_err(|_| invalid("worker", format!("report {}: missing worker_name", report_id)))?;

    let mut worker = WorkerAttendance::new(report_id, name, hours_field(row, "hours_worked"));
    worker.role = string_field(row, "role");
    worker.notes = string_field(row, "notes");
    Ok(worker)
}

pub fn site_from_row(row: &Row) -> Result<Site, ReportError> {
    serde_json::from_value(Value::Object(row.clone()))
        .map_err(|e| invalid("site", e.to_string()))
}

pub fn report_to_row(report: &DailyReport) -> Row {
    let value = json!({
        "id": report.id,
        "site_id": report.site_id,
        "user_id": report.user_id,
        "report_date": report.report_date.format("%Y-%m-%d").to_string(),
        "work_start_time": report.work_start_time.map(|t| t.format("%H:%M").to_string()),
        "work_end_time": report.work_end_time.map(|t| t.format("%H:%M").to_string()),
        "manpower": report.manpower,
        "progress_percentage": report.progress_percentage,
        "weather_type": report.weather_type.map(|w| w.as_str()),
        "weather": report.weather,
        "temperature": report.temperature,
        "work_description": report.work_description,
        "issues": report.issues,
        "issue_status": report.issue_status.as_str(),
        "next_day_plan": report.next_day_plan,
        "safety_checks": report.safety_checks,
    });
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub fn material_to_row(line: &MaterialUsageLine) -> Row {
    let mut row = Row::new();
    row.insert("report_id".to_string(), json!(line.report_id));
    row.insert("material_name".to_string(), json!(line.material_name));
    row.insert("quantity".to_string(), json!(line.quantity));
    row.insert("unit".to_string(), json!(line.unit));
    row
}

pub fn equipment_to_row(usage: &EquipmentUsage) -> Row {
    let mut row = Row::new();
    row.insert("report_id".to_string(), json!(usage.report_id));
    row.insert("equipment_name".to_string(), json!(usage.equipment_name));
    row.insert("usage_hours".to_string(), json!(usage.usage_hours));
    row.insert("operator".to_string(), json!(usage.operator));
    row.insert("notes".to_string(), json!(usage.notes));
    row
}

pub fn worker_to_row(worker: &WorkerAttendance) -> Row {
    let mut row = Row::new();
    row.insert("report_id".to_string(), json!(worker.report_id));
    row.insert("worker_name".to_string(), json!(worker.worker_name));
    row.insert("role".to_string(), json!(worker.role));
    row.insert("hours_worked".to_string(), json!(worker.hours_worked));
    row.insert("notes".to_string(), json!(worker.notes));
    row
}

pub fn site_to_row(site: &Site) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(site)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Row::new()),
    }
}
