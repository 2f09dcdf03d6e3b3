use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "totalHours")]
    pub total_hours: f64,
    #[serde(rename = "progressChange")]
    pub progress_change: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MaterialTotal {
    pub material_name: String,
    pub total_quantity: f64,
    pub unit: String,
}

// Derived monthly figures. Never persisted; recomputed on every request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    #[serde(with = "padded_month")]
    pub month: u32,
    pub total_reports: usize,
    pub total_work_hours: f64,
    pub average_progress: f64,
    pub sites_worked: Vec<SiteSummary>,
    pub material_usage: Vec<MaterialTotal>,
}

impl MonthlySummary {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            total_reports: 0,
            total_work_hours: 0.0,
            average_progress: 0.0,
            sites_worked: Vec::new(),
            material_usage: Vec::new(),
        }
    }

    // Sites whose progress moved during the month, largest gain first.
    pub fn progress_changes(&self) -> Vec<&SiteSummary> {
        let mut changed: Vec<&SiteSummary> = self
            .sites_worked
            .iter()
            .filter(|s| s.progress_change != 0.0)
            .collect();
        changed.sort_by(|a, b| {
            b.progress_change
                .partial_cmp(&a.progress_change)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        changed
    }
}

// "06" on the wire, plain u32 in memory.
mod padded_month {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(month: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:02}", month))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Month {
        Text(String),
        Number(u32),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match Month::deserialize(deserializer)? {
            Month::Number(month) => Ok(month),
            Month::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid month: '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_field_names() {
        let mut summary = MonthlySummary::new(2024, 6);
        summary.total_reports = 1;
        summary.total_work_hours = 9.0;
        summary.sites_worked.push(SiteSummary {
            id: "S1".to_string(),
            name: "北棟".to_string(),
            total_hours: 9.0,
            progress_change: 0.0,
        });
        summary.material_usage.push(MaterialTotal {
            material_name: "鉄筋".to_string(),
            total_quantity: 120.0,
            unit: "kg".to_string(),
        });

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "year": 2024,
                "month": "06",
                "totalReports": 1,
                "totalWorkHours": 9.0,
                "averageProgress": 0.0,
                "sitesWorked": [{"id": "S1", "name": "北棟", "totalHours": 9.0, "progressChange": 0.0}],
                "materialUsage": [{"material_name": "鉄筋", "total_quantity": 120.0, "unit": "kg"}]
            })
        );
    }

    #[test]
    fn test_month_reads_back_from_padded_string() {
        let summary = MonthlySummary::new(2024, 11);
        let text = serde_json::to_string(&summary).unwrap();
        assert!(text.contains("\"month\":\"11\""));
        let parsed: MonthlySummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.month, 11);

        let mut value = serde_json::to_value(MonthlySummary::new(2024, 3)).unwrap();
        assert_eq!(value["month"], json!("03"));
        value["month"] = json!(3);
        let parsed: MonthlySummary = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.month, 3);
    }

    #[test]
    fn test_progress_changes_sorted_and_filtered() {
        let mut summary = MonthlySummary::new(2024, 6);
        for (id, change) in [("A", 2.0), ("B", 0.0), ("C", -1.5), ("D", 7.5)] {
            summary.sites_worked.push(SiteSummary {
                id: id.to_string(),
                name: id.to_string(),
                total_hours: 0.0,
                progress_change: change,
            });
        }
        let ids: Vec<&str> = summary.progress_changes().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["D", "A", "C"]);
    }
}
