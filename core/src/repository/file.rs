use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use log::warn;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::report::{DailyReport, EquipmentUsage, MaterialUsageLine, WorkerAttendance};
use crate::model::site::Site;
use crate::repository::record::{equipment_to_row, material_to_row, report_to_row, site_to_row, worker_to_row};
use crate::repository::traits::{RecordFilter, RecordKind, RecordStore, Row};
use crate::time::parse_report_date;

const SITES_FILE_NAME: &str = "sites.json";
const REPORTS_FILE_NAME: &str = "reports.json";
const MATERIALS_FILE_NAME: &str = "materials.json";
const EQUIPMENT_FILE_NAME: &str = "equipment.json";
const WORKERS_FILE_NAME: &str = "workers.json";

const ALL_KINDS: [RecordKind; 5] = [
    RecordKind::Sites,
    RecordKind::Reports,
    RecordKind::Materials,
    RecordKind::Equipment,
    RecordKind::Workers,
];
const CHILD_KINDS: [RecordKind; 3] = [RecordKind::Materials, RecordKind::Equipment, RecordKind::Workers];

// One JSON array per record kind in a data directory.
#[derive(Clone)]
pub struct FileRecordStore {
    base_dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let path = match base_dir {
            Some(dir) => dir,
            None => {
                let home_dir = dirs::home_dir()
                    .ok_or_else(|| anyhow!("Could not determine home directory"))?;
                home_dir.join(".sitereport")
            }
        };
        fs::create_dir_all(&path)?;

        let store = FileRecordStore { base_dir: path };
        for kind in ALL_KINDS {
            let file = store.file_path(kind);
            if !file.exists() {
                store.write_rows(kind, &[])?;
            }
        }
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, kind: RecordKind) -> PathBuf {
        let name = match kind {
            RecordKind::Sites => SITES_FILE_NAME,
            RecordKind::Reports => REPORTS_FILE_NAME,
            RecordKind::Materials => MATERIALS_FILE_NAME,
            RecordKind::Equipment => EQUIPMENT_FILE_NAME,
            RecordKind::Workers => WORKERS_FILE_NAME,
        };
        self.base_dir.join(name)
    }

    fn read_rows(&self, kind: RecordKind) -> Result<Vec<Row>, StoreError> {
        let file = File::open(self.file_path(kind))?;
        let reader = BufReader::new(file);
        let rows: Vec<Row> = serde_json::from_reader(reader)?;
        Ok(rows)
    }

    fn write_rows(&self, kind: RecordKind, rows: &[Row]) -> Result<(), StoreError> {
        let file = File::create(self.file_path(kind))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, rows)?;
        writer.flush()?;
        Ok(())
    }

    // Upsert by id.
    pub fn insert_site(&self, site: &Site) -> Result<(), StoreError> {
        let mut rows = self.read_rows(RecordKind::Sites)?;
        let row = site_to_row(site)?;
        if let Some(pos) = rows.iter().position(|r| field(r, "id") == Some(site.id.as_str())) {
            rows[pos] = row;
        } else {
            rows.push(row);
        }
        self.write_rows(RecordKind::Sites, &rows)
    }

    // Stores a new report with the sub-records attached to it. An empty id is
    // replaced with a fresh uuid. Existing reports are never overwritten.
    // Sub-records go first and the report row last; if any write fails the
    // rows already written for this report are removed again.
    pub fn create_report(&self, mut report: DailyReport) -> Result<DailyReport, StoreError> {
        if report.id.is_empty() {
            report.id = Uuid::new_v4().to_string();
        }

        let rows = self.read_rows(RecordKind::Reports)?;
        if rows.iter().any(|r| field(r, "id") == Some(report.id.as_str())) {
            return Err(StoreError::Conflict(format!("report {} already exists", report.id)));
        }

        if let Err(e) = self.write_new_report(&mut report, rows) {
            warn!("creating report {} failed, rolling back: {}", report.id, e);
            self.remove_report_rows(&report.id);
            return Err(e);
        }
        Ok(report)
    }

    fn write_new_report(&self, report: &mut DailyReport, mut rows: Vec<Row>) -> Result<(), StoreError> {
        let materials = std::mem::take(&mut report.materials);
        report.materials = self.replace_materials(&report.id, materials)?;
        let equipment = std::mem::take(&mut report.equipment);
        report.equipment = self.replace_equipment(&report.id, equipment)?;
        let workers = std::mem::take(&mut report.workers);
        report.workers = self.replace_workers(&report.id, workers)?;

        rows.push(report_to_row(report));
        self.write_rows(RecordKind::Reports, &rows)
    }

    // Best effort. Kinds that cannot be read or written are skipped.
    fn remove_report_rows(&self, report_id: &str) {
        for kind in CHILD_KINDS {
            if let Err(e) = self.remove_rows(kind, "report_id", report_id) {
                warn!("rollback of {} for report {} failed: {}", kind.as_str(), report_id, e);
            }
        }
        if let Err(e) = self.remove_rows(RecordKind::Reports, "id", report_id) {
            warn!("rollback of report {} failed: {}", report_id, e);
        }
    }

    fn remove_rows(&self, kind: RecordKind, key: &str, value: &str) -> Result<(), StoreError> {
        let mut rows = self.read_rows(kind)?;
        let before = rows.len();
        rows.retain(|r| field(r, key) != Some(value));
        if rows.len() != before {
            self.write_rows(kind, &rows)?;
        }
        Ok(())
    }

    fn replace_children<T>(
        &self,
        kind: RecordKind,
        report_id: &str,
        items: Vec<T>,
        set_report_id: fn(&mut T, &str),
        to_row: fn(&T) -> Row,
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = self.read_rows(kind)?;
        rows.retain(|r| field(r, "report_id") != Some(report_id));

        let items: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                set_report_id(&mut item, report_id);
                item
            })
            .collect();
        rows.extend(items.iter().map(to_row));

        self.write_rows(kind, &rows)?;
        Ok(items)
    }

    // Deletes every material line of report_id and stores the given lines in
    // their place.
    pub fn replace_materials(
        &self,
        report_id: &str,
        materials: Vec<MaterialUsageLine>,
    ) -> Result<Vec<MaterialUsageLine>, StoreError> {
        self.replace_children(
            RecordKind::Materials,
            report_id,
            materials,
            |m, id| m.report_id = id.to_string(),
            material_to_row,
        )
    }

    pub fn replace_equipment(
        &self,
        report_id: &str,
        equipment: Vec<EquipmentUsage>,
    ) -> Result<Vec<EquipmentUsage>, StoreError> {
        self.replace_children(
            RecordKind::Equipment,
            report_id,
            equipment,
            |e, id| e.report_id = id.to_string(),
            equipment_to_row,
        )
    }

    pub fn replace_workers(
        &self,
        report_id: &str,
        workers: Vec<WorkerAttendance>,
    ) -> Result<Vec<WorkerAttendance>, StoreError> {
        self.replace_children(
            RecordKind::Workers,
            report_id,
            workers,
            |w, id| w.report_id = id.to_string(),
            worker_to_row,
        )
    }
}

fn field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

fn in_set(value: Option<&str>, set: &Option<HashSet<&str>>) -> bool {
    match set {
        Some(set) => value.map_or(false, |v| set.contains(v)),
        None => true,
    }
}

fn matches(kind: RecordKind, row: &Row, filter: &RecordFilter) -> bool {
    let site_ids: Option<HashSet<&str>> = filter
        .site_ids
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());
    let report_ids: Option<HashSet<&str>> = filter
        .report_ids
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());

    match kind {
        RecordKind::Sites => {
            let id = field(row, "id");
            filter.site_id.as_deref().map_or(true, |s| id == Some(s)) && in_set(id, &site_ids)
        }
        RecordKind::Reports => {
            let site_id = field(row, "site_id");
            if !filter.site_id.as_deref().map_or(true, |s| site_id == Some(s)) {
                return false;
            }
            if !in_set(site_id, &site_ids) || !in_set(field(row, "id"), &report_ids) {
                return false;
            }
            if let Some(user_id) = filter.user_id.as_deref() {
                if field(row, "user_id") != Some(user_id) {
                    return false;
                }
            }
            match filter.date_range {
                Some((from, to)) => field(row, "report_date")
                    .and_then(|d| parse_report_date(d).ok())
                    .map_or(false, |d| d >= from && d <= to),
                None => true,
            }
        }
        RecordKind::Materials | RecordKind::Equipment | RecordKind::Workers => {
            in_set(field(row, "report_id"), &report_ids)
        }
    }
}

impl RecordStore for FileRecordStore {
    fn query_records(&self, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<Row>, StoreError> {
        let rows = self.read_rows(kind)?;
        Ok(rows.into_iter().filter(|r| matches(kind, r, filter)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileRecordStore) {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(Some(dir.path().to_path_buf())).unwrap();
        (dir, store)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn with_material(id: &str, day: u32, quantity: f64) -> DailyReport {
        let mut report = DailyReport::new(id, "S1", date(day));
        report.materials.push(MaterialUsageLine::new("", "砂", quantity, "t"));
        report
    }

    fn report_rows(store: &FileRecordStore) -> Vec<Row> {
        store.query_records(RecordKind::Reports, &RecordFilter::default()).unwrap()
    }

    #[test]
    fn test_new_initialises_empty_files() {
        let (dir, store) = store();
        for name in [REPORTS_FILE_NAME, EQUIPMENT_FILE_NAME, WORKERS_FILE_NAME] {
            assert!(dir.path().join(name).exists());
        }
        let rows = store.query_records(RecordKind::Reports, &RecordFilter::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_create_report_assigns_id_and_stores_materials() {
        let (_dir, store) = store();
        let mut report = DailyReport::new("", "S1", date(1));
        report.materials.push(MaterialUsageLine::new("", "鉄筋", 120.0, "kg"));
        report.equipment.push(EquipmentUsage::new("", "バックホウ", Some(6.0)));
        report.workers.push(WorkerAttendance::new("", "田中", Some(8.0)));
        let created = store.create_report(report).unwrap();

        assert!(Uuid::parse_str(&created.id).is_ok());
        assert_eq!(created.materials[0].report_id, created.id);

        let rows = store
            .query_records(RecordKind::Materials, &RecordFilter::for_reports(vec![created.id.clone()]))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(field(&rows[0], "material_name"), Some("鉄筋"));

        let filter = RecordFilter::for_reports(vec![created.id.clone()]);
        let equipment = store.query_records(RecordKind::Equipment, &filter).unwrap();
        assert_eq!(field(&equipment[0], "equipment_name"), Some("バックホウ"));
        let workers = store.query_records(RecordKind::Workers, &filter).unwrap();
        assert_eq!(field(&workers[0], "report_id"), Some(created.id.as_str()));
    }

    #[test]
    fn test_create_report_rejects_duplicate_id() {
        let (_dir, store) = store();
        store.create_report(DailyReport::new("r1", "S1", date(1))).unwrap();
        let err = store.create_report(DailyReport::new("r1", "S1", date(2)));
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_replace_materials_only_touches_one_report() {
        let (_dir, store) = store();
        store.create_report(with_material("r1", 1, 2.0)).unwrap();
        store.create_report(with_material("r2", 2, 3.0)).unwrap();

        store
            .replace_materials("r1", vec![MaterialUsageLine::new("", "砂利", 5.0, "t")])
            .unwrap();

        let all = store.query_records(RecordKind::Materials, &RecordFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        let r1 = store
            .query_records(RecordKind::Materials, &RecordFilter::for_reports(vec!["r1".to_string()]))
            .unwrap();
        assert_eq!(field(&r1[0], "material_name"), Some("砂利"));

        store.replace_materials("r2", Vec::new()).unwrap();
        let r2 = store
            .query_records(RecordKind::Materials, &RecordFilter::for_reports(vec!["r2".to_string()]))
            .unwrap();
        assert!(r2.is_empty());
    }

    #[test]
    fn test_query_reports_with_filters() {
        let (_dir, store) = store();
        let mut a = DailyReport::new("a", "S1", date(1));
        a.user_id = Some("u1".to_string());
        store.create_report(a).unwrap();
        store.create_report(DailyReport::new("b", "S2", date(30))).unwrap();
        store
            .create_report(DailyReport::new("c", "S1", NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()))
            .unwrap();

        let june = RecordFilter {
            date_range: Some((date(1), date(30))),
            ..RecordFilter::default()
        };
        assert_eq!(store.query_records(RecordKind::Reports, &june).unwrap().len(), 2);

        let june_s1 = RecordFilter {
            site_id: Some("S1".to_string()),
            ..june.clone()
        };
        let rows = store.query_records(RecordKind::Reports, &june_s1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(field(&rows[0], "id"), Some("a"));

        let by_user = RecordFilter {
            user_id: Some("u1".to_string()),
            ..RecordFilter::default()
        };
        assert_eq!(store.query_records(RecordKind::Reports, &by_user).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_site_upserts() {
        let (_dir, store) = store();
        store.insert_site(&Site::new("S1", "北棟")).unwrap();
        store.insert_site(&Site::new("S1", "北棟改修")).unwrap();
        store.insert_site(&Site::new("S2", "南棟")).unwrap();

        let rows = store.query_records(RecordKind::Sites, &RecordFilter::default()).unwrap();
        assert_eq!(rows.len(), 2);

        let only = RecordFilter {
            site_ids: Some(vec!["S1".to_string()]),
            ..RecordFilter::default()
        };
        let rows = store.query_records(RecordKind::Sites, &only).unwrap();
        assert_eq!(field(&rows[0], "name"), Some("北棟改修"));
    }

    #[test]
    fn test_failed_material_write_leaves_no_report() {
        let (dir, store) = store();
        let materials_path = dir.path().join(MATERIALS_FILE_NAME);
        fs::remove_file(&materials_path).unwrap();
        fs::create_dir(&materials_path).unwrap();

        assert!(store.create_report(with_material("r1", 1, 2.0)).is_err());
        assert!(report_rows(&store).is_empty());

        fs::remove_dir(&materials_path).unwrap();
        fs::write(&materials_path, "[]").unwrap();

        let created = store.create_report(with_material("r1", 1, 2.0)).unwrap();
        assert_eq!(created.materials.len(), 1);
        assert_eq!(report_rows(&store).len(), 1);
    }

    #[test]
    fn test_failed_worker_write_rolls_back_materials() {
        let (dir, store) = store();
        let workers_path = dir.path().join(WORKERS_FILE_NAME);
        fs::remove_file(&workers_path).unwrap();
        fs::create_dir(&workers_path).unwrap();

        let mut report = with_material("r1", 1, 2.0);
        report.workers.push(WorkerAttendance::new("", "田中", None));
        assert!(store.create_report(report).is_err());

        assert!(report_rows(&store).is_empty());
        let materials = store.query_records(RecordKind::Materials, &RecordFilter::default()).unwrap();
        assert!(materials.is_empty());
    }
}
