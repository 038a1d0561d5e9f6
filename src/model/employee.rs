use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::utils::{dates, parse};

/// Elapsed days of tenure from which meal/transport and social entitlements apply.
pub const ENTITLEMENT_DAYS: i64 = 365;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "matricule": "COL-0042",
        "surname": "Rakoto",
        "given_name": "Hery",
        "campaign": "Outbound",
        "base_salary": "500000",
        "hire_date": "02/10/2024",
        "initial_leave_balance": "0",
        "leave_balance": "12.5",
        "last_accrual_period": "2026-09",
        "seniority": "2 years 0 months",
        "entitled": true
    })
)]
pub struct Employee {
    #[serde(default)]
    #[schema(example = "COL-0042")]
    pub matricule: String,

    #[serde(default)]
    pub surname: String,

    #[serde(default)]
    pub given_name: String,

    #[serde(default)]
    pub campaign: String,

    /// Monthly salary, stored as typed by HR (number or string).
    #[serde(default)]
    #[schema(value_type = String, example = "500000")]
    pub base_salary: Value,

    /// `DD/MM/YYYY` or `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "02/10/2024", nullable = true)]
    pub hire_date: Option<String>,

    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub initial_leave_balance: Value,

    /// Current leave balance in days, may be negative.
    #[serde(default)]
    #[schema(value_type = String, example = "12.5")]
    pub leave_balance: Value,

    /// `YYYY-MM` of the last leave accrual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2026-09", nullable = true)]
    pub last_accrual_period: Option<String>,

    #[serde(default)]
    #[schema(example = "2 years 0 months")]
    pub seniority: String,

    #[serde(default)]
    pub entitled: bool,

    /// Any other column HR keeps on the record, stored as given.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Employee {
    pub fn base_salary_amount(&self) -> f64 {
        parse::amount(&self.base_salary, 0.0)
    }

    pub fn hired_on(&self) -> Option<NaiveDate> {
        self.hire_date.as_deref().and_then(dates::parse_hire_date)
    }

    /// Current leave balance, or the initial balance when none was ever set.
    pub fn current_leave_balance(&self) -> f64 {
        if self.leave_balance.is_null() {
            parse::amount(&self.initial_leave_balance, 0.0)
        } else {
            parse::amount(&self.leave_balance, 0.0)
        }
    }

    /// Whole years of service; 0 without a usable hire date.
    pub fn seniority_years(&self, today: NaiveDate) -> i32 {
        self.hired_on()
            .map(|hired| dates::tenure_years(hired, today))
            .unwrap_or(0)
    }

    /// At least [`ENTITLEMENT_DAYS`] elapsed since hiring. Any time past
    /// midnight of the anniversary day counts as more than the full year.
    pub fn is_entitled(&self, today: NaiveDate) -> bool {
        self.hired_on()
            .map(|hired| dates::elapsed_days(hired, today) >= ENTITLEMENT_DAYS)
            .unwrap_or(false)
    }

    /// Recomputes the seniority display and entitlement flag from the hire date.
    pub fn refresh_derived(&mut self, today: NaiveDate) {
        self.seniority = match self.hired_on() {
            Some(hired) => {
                let (years, months) = dates::tenure(hired, today);
                format!("{years} years {months} months")
            }
            None => String::new(),
        };
        self.entitled = self.is_entitled(today);
    }

    /// Prepares a freshly registered record.
    pub fn prepare_new(&mut self, today: NaiveDate) {
        self.refresh_derived(today);

        let balance = parse::amount(&self.leave_balance, -1.0);
        if balance < 0.0 {
            let initial = parse::amount(&self.initial_leave_balance, 0.0);
            self.leave_balance = Value::from(initial);
        }
    }

    /// Merges the provided fields over this record. The matricule never changes.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> Result<Employee, serde_json::Error> {
        let mut doc = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (field, value) in patch {
            if field != "matricule" {
                doc.insert(field.clone(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(doc))
    }
}
