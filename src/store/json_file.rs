//! Flat JSON documents in one data directory.
//!
//! `employees.json` holds the registry as an array; the other documents are
//! objects keyed `{matricule}_{year}_{month}[_{day}]`, and `clocking.json`
//! is keyed `{matricule}_{YYYY-MM-DD}`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::lock::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{
    AdjustmentStore, AttendanceStore, ClockOut, ClockStore, EmployeeEdit, EmployeeRegistry,
    PlanningSource, StoreError,
};
use crate::model::adjustment::SalaryAdjustment;
use crate::model::attendance::{AttendanceCode, MonthAttendance};
use crate::model::clocking::ClockRecord;
use crate::model::employee::Employee;
use crate::model::planning::{MonthPlanning, ShiftCode};

const EMPLOYEES: &str = "employees.json";
const ATTENDANCE: &str = "attendance.json";
const SALARIES: &str = "salaries.json";
const PLANNING: &str = "planning.json";
const CLOCKING: &str = "clocking.json";

type Keyed = BTreeMap<String, Value>;

pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes every read-modify-write across the documents.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens `dir`, creating it and any missing document.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };
        fs::create_dir_all(&store.dir)?;

        for (file, empty) in [
            (EMPLOYEES, "[]"),
            (ATTENDANCE, "{}"),
            (SALARIES, "{}"),
            (PLANNING, "{}"),
            (CLOCKING, "{}"),
        ] {
            let path = store.path(file);
            if !path.exists() {
                info!(file, dir = %store.dir.display(), "Creating empty data document");
                fs::write(&path, empty)?;
            }
        }

        Ok(store)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let raw = match tokio::fs::read_to_string(self.path(file)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write<T: Serialize>(&self, file: &str, data: &T) -> Result<(), StoreError> {
        let path = self.path(file);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn day_key(matricule: &str, year: i32, month: u32, day: u32) -> String {
    format!("{matricule}_{year}_{month}_{day}")
}

fn month_key(matricule: &str, year: i32, month: u32) -> String {
    format!("{matricule}_{year}_{month}")
}

/// Splits `{matricule}_{year}_{month}_{day}`; the matricule may itself contain `_`.
fn parse_day_key(key: &str) -> Option<(&str, i32, u32, u32)> {
    let mut parts = key.rsplitn(4, '_');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    let matricule = parts.next()?;
    Some((matricule, year, month, day))
}

fn parse_month_key(key: &str) -> Option<(&str, i32, u32)> {
    let mut parts = key.rsplitn(3, '_');
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    let matricule = parts.next()?;
    Some((matricule, year, month))
}

fn attendance_code(value: &Value) -> Option<AttendanceCode> {
    value
        .as_str()
        .and_then(|s| AttendanceCode::from_str(s.trim()).ok())
}

fn adjustment_of(value: Value) -> SalaryAdjustment {
    match value {
        Value::Object(fields) => SalaryAdjustment(fields),
        _ => SalaryAdjustment::default(),
    }
}

#[async_trait]
impl EmployeeRegistry for JsonFileStore {
    async fn list(&self) -> Result<Vec<Employee>, StoreError> {
        self.read(EMPLOYEES).await
    }

    async fn get(&self, matricule: &str) -> Result<Option<Employee>, StoreError> {
        let employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        Ok(employees.into_iter().find(|e| e.matricule == matricule))
    }

    async fn insert(&self, employee: Employee) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        if employees.iter().any(|e| e.matricule == employee.matricule) {
            return Ok(false);
        }
        employees.push(employee);
        self.write(EMPLOYEES, &employees).await?;
        Ok(true)
    }

    async fn upsert(&self, employee: Employee) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        match employees
            .iter_mut()
            .find(|e| e.matricule == employee.matricule)
        {
            Some(existing) => *existing = employee,
            None => employees.push(employee),
        }
        self.write(EMPLOYEES, &employees).await
    }

    async fn update(
        &self,
        matricule: &str,
        edit: EmployeeEdit<'_>,
    ) -> Result<Option<Employee>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        let Some(employee) = employees.iter_mut().find(|e| e.matricule == matricule) else {
            return Ok(None);
        };
        edit(employee);
        employee.matricule = matricule.to_string();
        let updated = employee.clone();
        self.write(EMPLOYEES, &employees).await?;
        Ok(Some(updated))
    }

    async fn update_all(&self, edit: EmployeeEdit<'_>) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        employees.iter_mut().for_each(|e| edit(e));
        self.write(EMPLOYEES, &employees).await?;
        Ok(employees.len())
    }

    async fn delete(&self, matricule: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut employees: Vec<Employee> = self.read(EMPLOYEES).await?;
        let before = employees.len();
        employees.retain(|e| e.matricule != matricule);
        if employees.len() == before {
            return Ok(false);
        }
        self.write(EMPLOYEES, &employees).await?;
        Ok(true)
    }
}

#[async_trait]
impl AttendanceStore for JsonFileStore {
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<AttendanceCode>, StoreError> {
        let entries: Keyed = self.read(ATTENDANCE).await?;
        Ok(entries
            .get(&day_key(matricule, year, month, day))
            .and_then(attendance_code))
    }

    async fn set(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
        code: Option<AttendanceCode>,
    ) -> Result<Option<AttendanceCode>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries: Keyed = self.read(ATTENDANCE).await?;
        let key = day_key(matricule, year, month, day);

        let previous = match code {
            Some(code) => entries.insert(key, Value::from(code.as_ref())),
            None => entries.remove(&key),
        };

        self.write(ATTENDANCE, &entries).await?;
        Ok(previous.as_ref().and_then(attendance_code))
    }

    async fn month(&self, year: i32, month: u32) -> Result<MonthAttendance, StoreError> {
        let entries: Keyed = self.read(ATTENDANCE).await?;
        let mut snapshot = MonthAttendance::new(year, month);

        for (key, value) in &entries {
            let Some((matricule, y, m, day)) = parse_day_key(key) else {
                debug!(key, "Skipping malformed attendance key");
                continue;
            };
            if (y, m) != (year, month) {
                continue;
            }
            match attendance_code(value) {
                Some(code) => snapshot.insert(matricule, day, code),
                None => debug!(key, value = %value, "Skipping unrecognized attendance code"),
            }
        }

        Ok(snapshot)
    }
}

#[async_trait]
impl AdjustmentStore for JsonFileStore {
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
    ) -> Result<SalaryAdjustment, StoreError> {
        let mut salaries: Keyed = self.read(SALARIES).await?;
        Ok(salaries
            .remove(&month_key(matricule, year, month))
            .map(adjustment_of)
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        fields: Map<String, Value>,
    ) -> Result<SalaryAdjustment, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut salaries: Keyed = self.read(SALARIES).await?;
        let key = month_key(matricule, year, month);

        let mut adjustment = salaries
            .remove(&key)
            .map(adjustment_of)
            .unwrap_or_default();
        adjustment.merge(fields);

        salaries.insert(key, Value::Object(adjustment.0.clone()));
        self.write(SALARIES, &salaries).await?;
        Ok(adjustment)
    }

    async fn month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, SalaryAdjustment>, StoreError> {
        let salaries: Keyed = self.read(SALARIES).await?;
        Ok(salaries
            .into_iter()
            .filter_map(|(key, value)| {
                let (matricule, y, m) = parse_month_key(&key)?;
                ((y, m) == (year, month)).then(|| (matricule.to_string(), adjustment_of(value)))
            })
            .collect())
    }
}

#[async_trait]
impl PlanningSource for JsonFileStore {
    async fn month(&self, year: i32, month: u32) -> Result<MonthPlanning, StoreError> {
        let shifts: Keyed = self.read(PLANNING).await?;
        let mut snapshot = MonthPlanning::new(year, month);

        for (key, value) in &shifts {
            let Some((matricule, y, m, day)) = parse_day_key(key) else {
                continue;
            };
            if (y, m) != (year, month) {
                continue;
            }
            if let Some(shift) = value.as_str().and_then(|s| ShiftCode::from_str(s.trim()).ok()) {
                snapshot.insert(matricule, day, shift);
            }
        }

        Ok(snapshot)
    }

    async fn set_shift(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
        shift: Option<ShiftCode>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut shifts: Keyed = self.read(PLANNING).await?;
        let key = day_key(matricule, year, month, day);
        match shift {
            Some(shift) => {
                shifts.insert(key, Value::from(shift.as_ref()));
            }
            None => {
                shifts.remove(&key);
            }
        }
        self.write(PLANNING, &shifts).await
    }
}

fn clock_key(matricule: &str, date: NaiveDate) -> String {
    format!("{matricule}_{date}")
}

#[async_trait]
impl ClockStore for JsonFileStore {
    async fn find(
        &self,
        matricule: &str,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError> {
        let mut records: BTreeMap<String, ClockRecord> = self.read(CLOCKING).await?;
        Ok(records.remove(&clock_key(matricule, date)))
    }

    async fn open_day(&self, record: ClockRecord) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records: BTreeMap<String, ClockRecord> = self.read(CLOCKING).await?;
        let key = clock_key(&record.matricule, record.date);
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, record);
        self.write(CLOCKING, &records).await?;
        Ok(true)
    }

    async fn close_day(
        &self,
        matricule: &str,
        date: NaiveDate,
        at: NaiveTime,
        signature: String,
    ) -> Result<ClockOut, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records: BTreeMap<String, ClockRecord> = self.read(CLOCKING).await?;
        let Some(record) = records.get_mut(&clock_key(matricule, date)) else {
            return Ok(ClockOut::NotClockedIn);
        };
        if !record.close(at, signature) {
            return Ok(ClockOut::AlreadyClosed(record.clone()));
        }
        let closed = record.clone();
        self.write(CLOCKING, &records).await?;
        Ok(ClockOut::Closed(closed))
    }

    async fn range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClockRecord>, StoreError> {
        let records: BTreeMap<String, ClockRecord> = self.read(CLOCKING).await?;
        Ok(records
            .into_values()
            .filter(|r| (from..=to).contains(&r.date))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn employee(matricule: &str) -> Employee {
        Employee {
            matricule: matricule.into(),
            base_salary: json!(300000),
            ..Default::default()
        }
    }

    #[test]
    fn keys_split_from_the_right() {
        assert_eq!(parse_day_key("COL_42_2026_10_3"), Some(("COL_42", 2026, 10, 3)));
        assert_eq!(parse_month_key("E1_2026_10"), Some(("E1", 2026, 10)));
        assert_eq!(parse_day_key("E1_2026_x_3"), None);
        assert_eq!(parse_day_key("2026_10_3"), None);
    }

    #[test]
    fn open_creates_empty_documents() {
        let (dir, _store) = store();
        for file in [EMPLOYEES, ATTENDANCE, SALARIES, PLANNING, CLOCKING] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
    }

    #[actix_web::test]
    async fn registry_insert_rejects_duplicates() {
        let (_dir, store) = store();
        assert!(store.insert(employee("E1")).await.unwrap());
        assert!(!store.insert(employee("E1")).await.unwrap());
        assert!(store.insert(employee("E2")).await.unwrap());

        let listed: Vec<String> = EmployeeRegistry::list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.matricule)
            .collect();
        assert_eq!(listed, vec!["E1", "E2"]);
    }

    #[actix_web::test]
    async fn registry_update_and_delete() {
        let (_dir, store) = store();
        store.insert(employee("E1")).await.unwrap();

        let updated = store
            .update("E1", &|e: &mut Employee| e.campaign = "Inbound".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.campaign, "Inbound");
        assert!(store.update("E9", &|_: &mut Employee| {}).await.unwrap().is_none());

        assert!(store.delete("E1").await.unwrap());
        assert!(!store.delete("E1").await.unwrap());
        assert!(EmployeeRegistry::get(&store, "E1").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn registry_update_all_rewrites_every_record() {
        let (_dir, store) = store();
        store.insert(employee("E1")).await.unwrap();
        store.insert(employee("E2")).await.unwrap();

        let touched = store
            .update_all(&|e: &mut Employee| e.leave_balance = json!(1.5))
            .await
            .unwrap();
        assert_eq!(touched, 2);
        for e in EmployeeRegistry::list(&store).await.unwrap() {
            assert_eq!(e.current_leave_balance(), 1.5);
        }
    }

    #[actix_web::test]
    async fn empty_code_deletes_the_day() {
        let (_dir, store) = store();
        let previous = store
            .set("E1", 2026, 10, 5, Some(AttendanceCode::Present))
            .await
            .unwrap();
        assert_eq!(previous, None);

        let previous = store
            .set("E1", 2026, 10, 5, Some(AttendanceCode::Leave))
            .await
            .unwrap();
        assert_eq!(previous, Some(AttendanceCode::Present));

        let previous = store.set("E1", 2026, 10, 5, None).await.unwrap();
        assert_eq!(previous, Some(AttendanceCode::Leave));
        assert_eq!(AttendanceStore::get(&store, "E1", 2026, 10, 5).await.unwrap(), None);

        let raw: Keyed = store.read(ATTENDANCE).await.unwrap();
        assert!(raw.is_empty());
    }

    #[actix_web::test]
    async fn month_snapshot_filters_period_and_noise() {
        let (dir, store) = store();
        fs::write(
            dir.path().join(ATTENDANCE),
            json!({
                "E1_2026_10_1": "p",
                "E1_2026_10_2": "N",
                "E1_2026_10_3": "z",
                "E1_2026_11_1": "a",
                "garbage": "p"
            })
            .to_string(),
        )
        .unwrap();

        let month = AttendanceStore::month(&store, 2026, 10).await.unwrap();
        assert_eq!(month.len(), 2);
        assert_eq!(month.code("E1", 2), Some(AttendanceCode::Night));
        assert_eq!(month.code("E1", 3), None);
    }

    #[actix_web::test]
    async fn removed_document_reads_as_empty() {
        let (dir, store) = store();
        fs::remove_file(dir.path().join(EMPLOYEES)).unwrap();
        assert!(EmployeeRegistry::list(&store).await.unwrap().is_empty());

        store.insert(employee("E1")).await.unwrap();
        assert!(dir.path().join(EMPLOYEES).exists());
        assert!(!dir.path().join("employees.json.tmp").exists());
    }

    #[actix_web::test]
    async fn corrupt_document_is_an_error() {
        let (dir, store) = store();
        fs::write(dir.path().join(EMPLOYEES), "{not json").unwrap();
        assert!(matches!(
            EmployeeRegistry::list(&store).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[actix_web::test]
    async fn adjustments_merge_per_month() {
        let (_dir, store) = store();
        let first = json!({"production_bonus": 1000});
        let second = json!({"salary_advance": "20 000"});
        store
            .merge("E1", 2026, 10, first.as_object().cloned().unwrap())
            .await
            .unwrap();
        let merged = store
            .merge("E1", 2026, 10, second.as_object().cloned().unwrap())
            .await
            .unwrap();
        assert_eq!(merged.bonuses().production, 1000.0);
        assert_eq!(merged.salary_advance(), 20000.0);

        store
            .merge("E1", 2026, 9, first.as_object().cloned().unwrap())
            .await
            .unwrap();
        let october = AdjustmentStore::month(&store, 2026, 10).await.unwrap();
        assert_eq!(october.len(), 1);
        assert_eq!(AdjustmentStore::get(&store, "E2", 2026, 10).await.unwrap(), SalaryAdjustment::default());
    }

    #[actix_web::test]
    async fn planning_shifts_round_through_the_document() {
        let (_dir, store) = store();
        store
            .set_shift("E1", 2026, 10, 4, Some(ShiftCode::Off))
            .await
            .unwrap();
        store
            .set_shift("E1", 2026, 10, 5, Some(ShiftCode::Night))
            .await
            .unwrap();
        store.set_shift("E1", 2026, 10, 5, None).await.unwrap();

        let plan = PlanningSource::month(&store, 2026, 10).await.unwrap();
        assert_eq!(plan.days_off("E1"), vec![4]);
        assert_eq!(plan.shift("E1", 5), None);
    }

    fn clocked(matricule: &str, date: NaiveDate) -> ClockRecord {
        ClockRecord::open(
            matricule.into(),
            date,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            None,
            "sig".into(),
        )
    }

    #[actix_web::test]
    async fn a_day_is_clocked_in_and_out_once() {
        let (_dir, store) = store();
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();

        assert_eq!(
            store.close_day("E1", day, five, "out".into()).await.unwrap(),
            ClockOut::NotClockedIn
        );
        assert!(store.open_day(clocked("E1", day)).await.unwrap());
        assert!(!store.open_day(clocked("E1", day)).await.unwrap());

        let ClockOut::Closed(closed) = store.close_day("E1", day, five, "out".into()).await.unwrap()
        else {
            panic!("day should close");
        };
        assert_eq!(closed.hours_worked, Some(9.0));
        assert!(matches!(
            store.close_day("E1", day, five, "again".into()).await.unwrap(),
            ClockOut::AlreadyClosed(_)
        ));

        let found = store.find("E1", day).await.unwrap().unwrap();
        assert_eq!(found.signature_out.as_deref(), Some("out"));
        assert!(store.find("E2", day).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn clock_range_is_inclusive() {
        let (_dir, store) = store();
        for day in [1, 15, 31] {
            let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
            store.open_day(clocked("E1", date)).await.unwrap();
        }
        store
            .open_day(clocked("E1", NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()))
            .await
            .unwrap();

        let october = store
            .range(
                NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(october.len(), 3);
    }
}
