use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Foggy,
    Windy,
    Stormy,
    Other,
}

impl WeatherType {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "sunny" => Some(WeatherType::Sunny),
            "cloudy" => Some(WeatherType::Cloudy),
            "rainy" => Some(WeatherType::Rainy),
            "snowy" => Some(WeatherType::Snowy),
            "foggy" => Some(WeatherType::Foggy),
            "windy" => Some(WeatherType::Windy),
            "stormy" => Some(WeatherType::Stormy),
            "other" => Some(WeatherType::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherType::Sunny => "sunny",
            WeatherType::Cloudy => "cloudy",
            WeatherType::Rainy => "rainy",
            WeatherType::Snowy => "snowy",
            WeatherType::Foggy => "foggy",
            WeatherType::Windy => "windy",
            WeatherType::Stormy => "stormy",
            WeatherType::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    None,
    Pending,
    Resolved,
}

impl IssueStatus {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "none" => Some(IssueStatus::None),
            "pending" => Some(IssueStatus::Pending),
            "resolved" => Some(IssueStatus::Resolved),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::None => "none",
            IssueStatus::Pending => "pending",
            IssueStatus::Resolved => "resolved",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SafetyChecks {
    #[serde(default)]
    pub morning_meeting: bool,
    #[serde(default)]
    pub safety_equipment: bool,
    #[serde(default)]
    pub risk_assessment: bool,
    #[serde(default)]
    pub site_clean: bool,
    #[serde(default)]
    pub tools_inspection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl SafetyChecks {
    pub fn all_done(&self) -> bool {
        self.morning_meeting
            && self.safety_equipment
            && self.risk_assessment
            && self.site_clean
            && self.tools_inspection
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MaterialUsageLine {
    pub report_id: String,
    pub material_name: String,
    pub quantity: f64,
    pub unit: String,
}

impl MaterialUsageLine {
    pub fn new(
        report_id: impl Into<String>,
        material_name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            report_id: report_id.into(),
            material_name: material_name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EquipmentUsage {
    pub report_id: String,
    pub equipment_name: String,
    pub usage_hours: Option<f64>,
    pub operator: Option<String>,
    pub notes: Option<String>,
}

impl EquipmentUsage {
    pub fn new(report_id: impl Into<String>, equipment_name: impl Into<String>, usage_hours: Option<f64>) -> Self {
        Self {
            report_id: report_id.into(),
            equipment_name: equipment_name.into(),
            usage_hours,
            operator: None,
            notes: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkerAttendance {
    pub report_id: String,
    pub worker_name: String,
    pub role: Option<String>,
    pub hours_worked: Option<f64>,
    pub notes: Option<String>,
}

impl WorkerAttendance {
    pub fn new(report_id: impl Into<String>, worker_name: impl Into<String>, hours_worked: Option<f64>) -> Self {
        Self {
            report_id: report_id.into(),
            worker_name: worker_name.into(),
            role: None,
            hours_worked,
            notes: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub id: String,
    pub site_id: String,
    // Joined from the sites table, display only.
    pub site_name: Option<String>,
    pub user_id: Option<String>,
    pub report_date: NaiveDate,
    pub weather_type: Option<WeatherType>,
    pub weather: Option<String>,
    pub temperature: Option<f64>,
    pub work_start_time: Option<NaiveTime>,
    pub work_end_time: Option<NaiveTime>,
    pub manpower: Option<u32>,
    // None means "not measured", which is not the same as 0%.
    pub progress_percentage: Option<f64>,
    pub work_description: String,
    pub issues: Option<String>,
    pub issue_status: IssueStatus,
    pub next_day_plan: Option<String>,
    pub safety_checks: Option<SafetyChecks>,
    pub materials: Vec<MaterialUsageLine>,
    pub equipment: Vec<EquipmentUsage>,
    pub workers: Vec<WorkerAttendance>,
}

impl DailyReport {
    pub fn new(id: impl Into<String>, site_id: impl Into<String>, report_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            site_id: site_id.into(),
            site_name: None,
            user_id: None,
            report_date,
            weather_type: None,
            weather: None,
            temperature: None,
            work_start_time: None,
            work_end_time: None,
            manpower: None,
            progress_percentage: None,
            work_description: String::new(),
            issues: None,
            issue_status: IssueStatus::default(),
            next_day_plan: None,
            safety_checks: None,
            materials: Vec::new(),
            equipment: Vec::new(),
            workers: Vec::new(),
        }
    }

    // Minute resolution. Missing times or an end before the start count as zero.
    pub fn work_hours(&self) -> f64 {
        match (self.work_start_time, self.work_end_time) {
            (Some(start), Some(end)) => {
                let hours = (minutes_since_midnight(end) - minutes_since_midnight(start)) as f64 / 60.0;
                if hours > 0.0 {
                    hours
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

fn minutes_since_midnight(time: NaiveTime) -> i64 {
    time.hour() as i64 * 60 + time.minute() as i64
}
