//! Persistence seams of the payroll engine.
//!
//! Each store is a trait so the same handlers and calculator run over either
//! the flat JSON documents or the MySQL tables.

pub mod json_file;
pub mod mysql;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use derive_more::{Display, From};
use serde_json::{Map, Value};

use crate::config::{Config, StoreBackend};
use crate::db::init_db;
use crate::model::adjustment::SalaryAdjustment;
use crate::model::attendance::{AttendanceCode, MonthAttendance};
use crate::model::clocking::ClockRecord;
use crate::model::employee::Employee;
use crate::model::planning::{MonthPlanning, ShiftCode};

#[derive(Debug, Display, From)]
pub enum StoreError {
    #[display(fmt = "store i/o failure: {}", _0)]
    Io(std::io::Error),
    #[display(fmt = "corrupt store document: {}", _0)]
    Corrupt(serde_json::Error),
    #[display(fmt = "database failure: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {}

/// Record mutation applied under the store's write serialization.
pub type EmployeeEdit<'a> = &'a (dyn Fn(&mut Employee) + Send + Sync);

#[async_trait]
pub trait EmployeeRegistry: Send + Sync {
    /// All employees in registry order.
    async fn list(&self) -> Result<Vec<Employee>, StoreError>;

    async fn get(&self, matricule: &str) -> Result<Option<Employee>, StoreError>;

    /// Adds a new record; `false` when the matricule is already taken.
    async fn insert(&self, employee: Employee) -> Result<bool, StoreError>;

    async fn upsert(&self, employee: Employee) -> Result<(), StoreError>;

    /// Read-modify-write of one record; `None` when it does not exist.
    async fn update(
        &self,
        matricule: &str,
        edit: EmployeeEdit<'_>,
    ) -> Result<Option<Employee>, StoreError>;

    /// Read-modify-write of the whole registry as one unit. Returns the number of records.
    async fn update_all(&self, edit: EmployeeEdit<'_>) -> Result<usize, StoreError>;

    /// `false` when nothing was deleted.
    async fn delete(&self, matricule: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<AttendanceCode>, StoreError>;

    /// Writes the day's code, or deletes it for `None`. Returns the previous code.
    async fn set(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
        code: Option<AttendanceCode>,
    ) -> Result<Option<AttendanceCode>, StoreError>;

    async fn month(&self, year: i32, month: u32) -> Result<MonthAttendance, StoreError>;
}

#[async_trait]
pub trait AdjustmentStore: Send + Sync {
    /// Empty adjustment when none was recorded.
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
    ) -> Result<SalaryAdjustment, StoreError>;

    /// Overlays `fields` on the stored adjustment and returns the result.
    async fn merge(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        fields: Map<String, Value>,
    ) -> Result<SalaryAdjustment, StoreError>;

    /// Adjustments of one month keyed by matricule.
    async fn month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, SalaryAdjustment>, StoreError>;
}

#[async_trait]
pub trait PlanningSource: Send + Sync {
    async fn month(&self, year: i32, month: u32) -> Result<MonthPlanning, StoreError>;

    /// Records the imported shift of a day, or clears it for `None`.
    async fn set_shift(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
        shift: Option<ShiftCode>,
    ) -> Result<(), StoreError>;
}

/// Result of closing a clocked day.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockOut {
    Closed(ClockRecord),
    AlreadyClosed(ClockRecord),
    NotClockedIn,
}

#[async_trait]
pub trait ClockStore: Send + Sync {
    /// The employee's record of `date`, if they clocked in.
    async fn find(
        &self,
        matricule: &str,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError>;

    /// Opens the day; `false` when the employee already has a record for that date.
    async fn open_day(&self, record: ClockRecord) -> Result<bool, StoreError>;

    /// Closes the day under the store's write serialization.
    async fn close_day(
        &self,
        matricule: &str,
        date: NaiveDate,
        at: NaiveTime,
        signature: String,
    ) -> Result<ClockOut, StoreError>;

    /// Every record dated within `from..=to`.
    async fn range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClockRecord>, StoreError>;
}

/// Store handles shared by the handlers and the payroll engine.
#[derive(Clone)]
pub struct Stores {
    pub employees: Arc<dyn EmployeeRegistry>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub adjustments: Arc<dyn AdjustmentStore>,
    pub planning: Arc<dyn PlanningSource>,
    pub clocking: Arc<dyn ClockStore>,
    pub backend: StoreBackend,
}

impl Stores {
    pub fn from_backend<B>(backend: Arc<B>, kind: StoreBackend) -> Self
    where
        B: EmployeeRegistry
            + AttendanceStore
            + AdjustmentStore
            + PlanningSource
            + ClockStore
            + 'static,
    {
        Self {
            employees: backend.clone(),
            attendance: backend.clone(),
            adjustments: backend.clone(),
            planning: backend.clone(),
            clocking: backend,
            backend: kind,
        }
    }
}

/// Opens the backend selected by the configuration.
pub async fn open(config: &Config) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::Json => {
            let store = json_file::JsonFileStore::open(&config.data_dir)
                .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
            Ok(Stores::from_backend(Arc::new(store), StoreBackend::Json))
        }
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the mysql backend")?;
            let pool = init_db(url).await?;
            Ok(Stores::from_backend(
                Arc::new(mysql::MySqlStore::new(pool)),
                StoreBackend::Mysql,
            ))
        }
    }
}
