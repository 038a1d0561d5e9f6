//! Relational backend over the tables in `migrations/`.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures_util::TryStreamExt;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{
    AdjustmentStore, AttendanceStore, ClockOut, ClockStore, EmployeeEdit, EmployeeRegistry,
    PlanningSource, StoreError,
};
use crate::model::adjustment::SalaryAdjustment;
use crate::model::attendance::{AttendanceCode, MonthAttendance};
use crate::model::clocking::ClockRecord;
use crate::model::employee::Employee;
use crate::model::planning::{MonthPlanning, ShiftCode};

const EMPLOYEE_COLUMNS: &str = "matricule, surname, given_name, campaign, base_salary, hire_date, \
     initial_leave_balance, leave_balance, last_accrual_period, seniority, entitled, extra";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    matricule: String,
    surname: String,
    given_name: String,
    campaign: String,
    base_salary: Option<String>,
    hire_date: Option<String>,
    initial_leave_balance: Option<String>,
    leave_balance: Option<String>,
    last_accrual_period: Option<String>,
    seniority: String,
    entitled: bool,
    extra: Option<Json<Map<String, Value>>>,
}

fn raw_value(raw: Option<String>) -> Value {
    raw.map(Value::String).unwrap_or(Value::Null)
}

fn raw_column(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            matricule: row.matricule,
            surname: row.surname,
            given_name: row.given_name,
            campaign: row.campaign,
            base_salary: raw_value(row.base_salary),
            hire_date: row.hire_date,
            initial_leave_balance: raw_value(row.initial_leave_balance),
            leave_balance: raw_value(row.leave_balance),
            last_accrual_period: row.last_accrual_period,
            seniority: row.seniority,
            entitled: row.entitled,
            extra: row.extra.map(|Json(extra)| extra).unwrap_or_default(),
        }
    }
}

#[derive(FromRow)]
struct DayRow {
    matricule: String,
    day: u8,
    code: String,
}

#[derive(FromRow)]
struct AdjustmentRow {
    matricule: String,
    fields: Json<Map<String, Value>>,
}

async fn write_employee(
    tx: &mut Transaction<'_, MySql>,
    employee: &Employee,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE employees
        SET surname = ?, given_name = ?, campaign = ?, base_salary = ?, hire_date = ?,
            initial_leave_balance = ?, leave_balance = ?, last_accrual_period = ?,
            seniority = ?, entitled = ?, extra = ?
        WHERE matricule = ?
        "#,
    )
    .bind(&employee.surname)
    .bind(&employee.given_name)
    .bind(&employee.campaign)
    .bind(raw_column(&employee.base_salary))
    .bind(&employee.hire_date)
    .bind(raw_column(&employee.initial_leave_balance))
    .bind(raw_column(&employee.leave_balance))
    .bind(&employee.last_accrual_period)
    .bind(&employee.seniority)
    .bind(employee.entitled)
    .bind(Json(&employee.extra))
    .bind(&employee.matricule)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl EmployeeRegistry for MySqlStore {
    async fn list(&self) -> Result<Vec<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY position");
        let mut rows = sqlx::query_as::<_, EmployeeRow>(&sql).fetch(&self.pool);

        let mut employees = Vec::new();
        while let Some(row) = rows.try_next().await? {
            employees.push(Employee::from(row));
        }
        Ok(employees)
    }

    async fn get(&self, matricule: &str) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE matricule = ?");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(matricule)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn insert(&self, employee: Employee) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO employees
            (matricule, surname, given_name, campaign, base_salary, hire_date,
             initial_leave_balance, leave_balance, last_accrual_period, seniority, entitled, extra)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.matricule)
        .bind(&employee.surname)
        .bind(&employee.given_name)
        .bind(&employee.campaign)
        .bind(raw_column(&employee.base_salary))
        .bind(&employee.hire_date)
        .bind(raw_column(&employee.initial_leave_balance))
        .bind(raw_column(&employee.leave_balance))
        .bind(&employee.last_accrual_period)
        .bind(&employee.seniority)
        .bind(employee.entitled)
        .bind(Json(&employee.extra))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert(&self, employee: Employee) -> Result<(), StoreError> {
        if self.insert(employee.clone()).await? {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        write_employee(&mut tx, &employee).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        matricule: &str,
        edit: EmployeeEdit<'_>,
    ) -> Result<Option<Employee>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let sql =
            format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE matricule = ? FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(matricule)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let mut employee = Employee::from(row);
        edit(&mut employee);
        employee.matricule = matricule.to_string();

        write_employee(&mut tx, &employee).await?;
        tx.commit().await?;
        Ok(Some(employee))
    }

    async fn update_all(&self, edit: EmployeeEdit<'_>) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY position FOR UPDATE");
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .fetch_all(&mut *tx)
            .await?;

        let count = rows.len();
        for row in rows {
            let mut employee = Employee::from(row);
            edit(&mut employee);
            write_employee(&mut tx, &employee).await?;
        }

        tx.commit().await?;
        Ok(count)
    }

    async fn delete(&self, matricule: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM employees WHERE matricule = ?")
            .bind(matricule)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<AttendanceCode>, StoreError> {
        let code = sqlx::query_scalar::<_, String>(
            "SELECT code FROM attendance WHERE matricule = ? AND year = ? AND month = ? AND day = ?",
        )
        .bind(matricule)
        .bind(year)
        .bind(month)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code.and_then(|c| AttendanceCode::from_str(&c).ok()))
    }

    async fn set(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        day: u32,
        code: Option<AttendanceCode>,
    ) -> Result<Option<AttendanceCode>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, String>(
            "SELECT code FROM attendance WHERE matricule = ? AND year = ? AND month = ? AND day = ? FOR UPDATE",
        )
        .bind(matricule)
        .bind(year)
        .bind(month)
        .bind(day)
        .fetch_optional(&mut *tx)
        .await?;

        match code {
            Some(code) => {
                sqlx::query(
                    r#"
                    INSERT INTO attendance (matricule, year, month, day, code)
                    VALUES (?, ?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE code = VALUES(code)
                    "#,
                )
                .bind(matricule)
                .bind(year)
                .bind(month)
                .bind(day)
                .bind(code.as_ref())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM attendance WHERE matricule = ? AND year = ? AND month = ? AND day = ?",
                )
                .bind(matricule)
                .bind(year)
                .bind(month)
                .bind(day)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(previous.and_then(|c| AttendanceCode::from_str(&c).ok()))
    }

    async fn month(&self, year: i32, month: u32) -> Result<MonthAttendance, StoreError> {
        let mut rows = sqlx::query_as::<_, DayRow>(
            "SELECT matricule, day, code FROM attendance WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month)
        .fetch(&self.pool);

        let mut snapshot = MonthAttendance::new(year, month);
        while let Some(row) = rows.try_next().await? {
            match AttendanceCode::from_str(&row.code) {
                Ok(code) => snapshot.insert(&row.matricule, u32::from(row.day), code),
                Err(_) => debug!(matricule = %row.matricule, code = %row.code, "Skipping unrecognized attendance code"),
            }
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl AdjustmentStore for MySqlStore {
    async fn get(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
    ) -> Result<SalaryAdjustment, StoreError> {
        let fields = sqlx::query_scalar::<_, Json<Map<String, Value>>>(
            "SELECT fields FROM salary_adjustments WHERE matricule = ? AND year = ? AND month = ?",
        )
        .bind(matricule)
        .bind(year)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(fields
            .map(|Json(fields)| SalaryAdjustment(fields))
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        matricule: &str,
        year: i32,
        month: u32,
        fields: Map<String, Value>,
    ) -> Result<SalaryAdjustment, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, Json<Map<String, Value>>>(
            "SELECT fields FROM salary_adjustments WHERE matricule = ? AND year = ? AND month = ? FOR UPDATE",
        )
        .bind(matricule)
        .bind(year)
        .bind(month)
        .fetch_optional(&mut *tx)
        .await?;

        let mut adjustment = current
            .map(|Json(fields)| SalaryAdjustment(fields))
            .unwrap_or_default();
        adjustment.merge(fields);

        sqlx::query(
            r#"
            INSERT INTO salary_adjustments (matricule, year, month, fields)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE fields = VALUES(fields)
            "#,
        )
        .bind(matricule)
        .bind(year)
        .bind(month)
        .bind(Json(&adjustment.0))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(adjustment)
    }

    async fn month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, SalaryAdjustment>, StoreError> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(
            "SELECT matricule, fields FROM salary_adjustments WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.matricule, SalaryAdjustment(row.fields.0)))
            .collect())
    }
}

#[derive(FromRow)]
struct ShiftRow {
    matricule: String,
    day: u8,
    shift: String,
}

#[async_trait]
impl PlanningSource for MySqlStore {
    async fn month(&self, year: i32, month: u32) -> Result<MonthPlanning, StoreError> {
        let mut rows = sqlx::query_as::<_, ShiftRow>(
            "SELECT matricule, day, shift FROM planning_shifts WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month)
        .fetch(&self.pool);

        let mut snapshot = MonthPlanning::new(year, month);
        while let Some(row) = rows.try_next().await? {
            if let Ok(shift) = ShiftCode::from_str(&row.shift) {
                snapshot.insert(&row.matricule, u32::from(row.day), shift);
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
        match shift {
            Some(shift) => {
                sqlx::query(
                    r#"
                    INSERT INTO planning_shifts (matricule, year, month, day, shift)
                    VALUES (?, ?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE shift = VALUES(shift)
                    "#,
                )
                .bind(matricule)
                .bind(year)
                .bind(month)
                .bind(day)
                .bind(shift.as_ref())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM planning_shifts WHERE matricule = ? AND year = ? AND month = ? AND day = ?",
                )
                .bind(matricule)
                .bind(year)
                .bind(month)
                .bind(day)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}

const CLOCK_COLUMNS: &str = "matricule, work_date, clock_in, clock_out, shift, hours_worked, \
     signature_in, signature_out";

#[derive(FromRow)]
struct ClockRow {
    matricule: String,
    work_date: NaiveDate,
    clock_in: NaiveTime,
    clock_out: Option<NaiveTime>,
    shift: String,
    hours_worked: Option<f64>,
    signature_in: String,
    signature_out: Option<String>,
}

impl From<ClockRow> for ClockRecord {
    fn from(row: ClockRow) -> Self {
        ClockRecord {
            matricule: row.matricule,
            date: row.work_date,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            shift: row.shift,
            hours_worked: row.hours_worked,
            signature_in: row.signature_in,
            signature_out: row.signature_out,
        }
    }
}

#[async_trait]
impl ClockStore for MySqlStore {
    async fn find(
        &self,
        matricule: &str,
        date: NaiveDate,
    ) -> Result<Option<ClockRecord>, StoreError> {
        let sql =
            format!("SELECT {CLOCK_COLUMNS} FROM clock_records WHERE matricule = ? AND work_date = ?");
        let row = sqlx::query_as::<_, ClockRow>(&sql)
            .bind(matricule)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ClockRecord::from))
    }

    async fn open_day(&self, record: ClockRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO clock_records
            (matricule, work_date, clock_in, clock_out, shift, hours_worked, signature_in, signature_out)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.matricule)
        .bind(record.date)
        .bind(record.clock_in)
        .bind(record.clock_out)
        .bind(&record.shift)
        .bind(record.hours_worked)
        .bind(&record.signature_in)
        .bind(&record.signature_out)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn close_day(
        &self,
        matricule: &str,
        date: NaiveDate,
        at: NaiveTime,
        signature: String,
    ) -> Result<ClockOut, StoreError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "SELECT {CLOCK_COLUMNS} FROM clock_records WHERE matricule = ? AND work_date = ? FOR UPDATE"
        );
        let Some(row) = sqlx::query_as::<_, ClockRow>(&sql)
            .bind(matricule)
            .bind(date)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(ClockOut::NotClockedIn);
        };

        let mut record = ClockRecord::from(row);
        if !record.close(at, signature) {
            return Ok(ClockOut::AlreadyClosed(record));
        }

        sqlx::query(
            r#"
            UPDATE clock_records
            SET clock_out = ?, hours_worked = ?, signature_out = ?
            WHERE matricule = ? AND work_date = ?
            "#,
        )
        .bind(record.clock_out)
        .bind(record.hours_worked)
        .bind(&record.signature_out)
        .bind(matricule)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ClockOut::Closed(record))
    }

    async fn range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClockRecord>, StoreError> {
        let sql = format!(
            "SELECT {CLOCK_COLUMNS} FROM clock_records WHERE work_date BETWEEN ? AND ? ORDER BY work_date"
        );
        let rows = sqlx::query_as::<_, ClockRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ClockRecord::from).collect())
    }
}
