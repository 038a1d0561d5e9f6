//! Monthly payslip computation.
//!
//! [`PayrollCalculator::calculate`] reads every input of the month up front,
//! then runs [`compute_payslip`] for each employee in registry order. An
//! employee whose record cannot be computed is logged and left out; only an
//! unreadable store fails the whole run.

use chrono::NaiveDate;
use derive_more::Display;
use tracing::{debug, info, warn};

use crate::model::adjustment::SalaryAdjustment;
use crate::model::attendance::MonthAttendance;
use crate::model::employee::Employee;
use crate::model::payslip::Payslip;
use crate::model::planning::{MonthPlanning, STANDARD_DAY_HOURS};
use crate::payroll::aggregator::aggregate;
use crate::payroll::{tax, working_days};
use crate::store::{StoreError, Stores};
use crate::utils::parse::round_currency;

pub const NIGHT_PREMIUM_RATE: f64 = 0.30;
pub const HOLIDAY_PREMIUM_RATE: f64 = 1.00;
/// Flat amount paid per training day.
pub const TRAINING_DAY_INDEMNITY: f64 = 10_000.0;
pub const MEAL_ALLOWANCE_PER_DAY: f64 = 2_500.0;
pub const TRANSPORT_ALLOWANCE_PER_DAY: f64 = 1_200.0;
/// Share of gross withheld for each of the two social funds.
pub const SOCIAL_FUND_RATE: f64 = 0.01;

#[derive(Debug, Display, PartialEq)]
pub enum PayrollError {
    #[display(fmt = "employee record has no matricule")]
    MissingMatricule,
    #[display(fmt = "{} of {} is not a finite amount", field, matricule)]
    NonFinite {
        matricule: String,
        field: &'static str,
    },
}

impl std::error::Error for PayrollError {}

/// Working days used for the month: a positive override wins over the estimate.
pub fn resolve_working_days(year: i32, month: u32, override_days: Option<u32>) -> u32 {
    match override_days {
        Some(days) if days > 0 => days,
        _ => working_days::estimate(year, month),
    }
}

/// Computes one employee's payslip from already loaded month inputs.
pub fn compute_payslip(
    employee: &Employee,
    attendance: &MonthAttendance,
    planning: &MonthPlanning,
    adjustment: &SalaryAdjustment,
    working_days: u32,
    today: NaiveDate,
) -> Result<Payslip, PayrollError> {
    let matricule = employee.matricule.trim();
    if matricule.is_empty() {
        return Err(PayrollError::MissingMatricule);
    }
    let finite = |field: &'static str, value: f64| {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PayrollError::NonFinite {
                matricule: matricule.to_string(),
                field,
            })
        }
    };

    let (year, month) = (attendance.year, attendance.month);
    let base_salary = finite("base_salary", employee.base_salary_amount())?;
    let entitled = employee.is_entitled(today);
    let flag = if entitled { 1.0 } else { 0.0 };
    let seniority_years = employee.seniority_years(today);

    let totals = aggregate(matricule, year, month, attendance, planning);

    let theoretical_hours = f64::from(working_days) * STANDARD_DAY_HOURS;
    let hourly_rate = if theoretical_hours > 0.0 {
        base_salary / theoretical_hours
    } else {
        0.0
    };

    let absence_deduction = totals.absence * hourly_rate;
    let worked_amount = (base_salary - absence_deduction).max(0.0);

    let night_premium = totals.night * hourly_rate * NIGHT_PREMIUM_RATE;
    let holiday_premium = totals.holiday * hourly_rate * HOLIDAY_PREMIUM_RATE;
    let leave_indemnity = totals.leave * hourly_rate;
    let training_indemnity = f64::from(totals.training_days) * TRAINING_DAY_INDEMNITY;

    let worked_days = (totals.worked_real / STANDARD_DAY_HOURS + 0.5).floor();
    let meal_allowance = worked_days * MEAL_ALLOWANCE_PER_DAY * flag;
    let transport_allowance = worked_days * TRANSPORT_ALLOWANCE_PER_DAY * flag;

    let bonuses = adjustment.bonuses();
    let social_contribution = finite("social_contribution", adjustment.social_contribution())?;
    let salary_advance = finite("salary_advance", adjustment.salary_advance())?;

    let gross = finite(
        "gross_pay",
        worked_amount
            + night_premium
            + holiday_premium
            + leave_indemnity
            + training_indemnity
            + bonuses.total()
            + meal_allowance
            + transport_allowance,
    )?;

    let (health_fund, pension_fund) = if seniority_years >= 1 && entitled {
        (gross * SOCIAL_FUND_RATE, gross * SOCIAL_FUND_RATE)
    } else {
        (0.0, 0.0)
    };
    let income_tax = tax::income_tax(gross) * flag;

    let net = gross - (salary_advance + health_fund + pension_fund + social_contribution + income_tax);

    let attendance_percentage = if theoretical_hours > 0.0 {
        totals.worked_real / theoretical_hours * 100.0
    } else {
        0.0
    };

    Ok(Payslip {
        matricule: matricule.to_string(),
        surname: employee.surname.clone(),
        given_name: employee.given_name.clone(),
        campaign: employee.campaign.clone(),

        base_salary: round_currency(base_salary),
        hourly_rate,
        leave_balance: employee.current_leave_balance(),
        seniority_years: seniority_years.max(0),
        entitled,

        presence_hours: totals.presence,
        worked_hours: totals.worked_real,
        leave_hours: totals.leave,
        holiday_hours: totals.holiday,
        night_hours: totals.night,
        training_hours: totals.training,
        absence_hours: totals.absence,
        absence_days: totals.absence_days(),
        training_days: totals.training_days,
        off_days: totals.off_days,

        absence_deduction: round_currency(absence_deduction),
        worked_amount: round_currency(worked_amount),
        night_premium: round_currency(night_premium),
        holiday_premium: round_currency(holiday_premium),
        leave_indemnity: round_currency(leave_indemnity),
        training_indemnity: round_currency(training_indemnity),

        production_bonus: round_currency(bonuses.production),
        attendance_bonus: round_currency(bonuses.attendance),
        seniority_bonus: round_currency(bonuses.seniority),
        elite_bonus: round_currency(bonuses.elite),
        responsibility_bonus: round_currency(bonuses.responsibility),

        meal_allowance: round_currency(meal_allowance),
        transport_allowance: round_currency(transport_allowance),

        gross_pay: round_currency(gross),

        salary_advance: round_currency(salary_advance),
        health_fund: round_currency(health_fund),
        pension_fund: round_currency(pension_fund),
        social_contribution: round_currency(social_contribution),
        income_tax: round_currency(income_tax),

        net_pay: round_currency(net),

        working_days,
        theoretical_hours,
        attendance_percentage,
    })
}

/// Month-level payroll run over the injected stores.
pub struct PayrollCalculator<'a> {
    stores: &'a Stores,
    today: NaiveDate,
}

impl<'a> PayrollCalculator<'a> {
    pub fn new(stores: &'a Stores, today: NaiveDate) -> Self {
        Self { stores, today }
    }

    /// Payslips of every computable employee, in registry order.
    pub async fn calculate(
        &self,
        year: i32,
        month: u32,
        working_days_override: Option<u32>,
    ) -> Result<Vec<Payslip>, StoreError> {
        let working_days = resolve_working_days(year, month, working_days_override);

        let employees = self.stores.employees.list().await?;
        let attendance = self.stores.attendance.month(year, month).await?;
        let adjustments = self.stores.adjustments.month(year, month).await?;
        let planning = self.stores.planning.month(year, month).await?;

        debug!(
            year,
            month,
            working_days,
            employees = employees.len(),
            attendance_entries = attendance.len(),
            "Loaded payroll inputs"
        );
        if attendance.is_empty() && !employees.is_empty() {
            warn!(year, month, "No attendance recorded for the period");
        }

        let empty = SalaryAdjustment::default();
        let mut payslips = Vec::with_capacity(employees.len());

        for employee in &employees {
            let adjustment = adjustments
                .get(employee.matricule.trim())
                .unwrap_or(&empty);

            match compute_payslip(
                employee,
                &attendance,
                &planning,
                adjustment,
                working_days,
                self.today,
            ) {
                Ok(payslip) => payslips.push(payslip),
                Err(e) => warn!(
                    matricule = %employee.matricule,
                    year,
                    month,
                    "Skipping employee in payroll run: {}",
                    e
                ),
            }
        }

        info!(
            year,
            month,
            computed = payslips.len(),
            skipped = employees.len() - payslips.len(),
            "Payroll calculated"
        );

        Ok(payslips)
    }
}
