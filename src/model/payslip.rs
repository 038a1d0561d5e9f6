use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Computed pay record of one employee for one month.
///
/// Currency fields are whole units; rates, hours and percentages keep their
/// raw decimal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payslip {
    #[schema(example = "COL-0042")]
    pub matricule: String,
    pub surname: String,
    pub given_name: String,
    pub campaign: String,

    #[schema(example = 500000)]
    pub base_salary: i64,
    #[schema(example = 2840.909)]
    pub hourly_rate: f64,
    pub leave_balance: f64,
    pub seniority_years: i32,
    pub entitled: bool,

    pub presence_hours: f64,
    pub worked_hours: f64,
    pub leave_hours: f64,
    pub holiday_hours: f64,
    pub night_hours: f64,
    pub training_hours: f64,
    pub absence_hours: f64,
    pub absence_days: f64,
    pub training_days: u32,
    pub off_days: u32,

    pub absence_deduction: i64,
    pub worked_amount: i64,
    pub night_premium: i64,
    pub holiday_premium: i64,
    pub leave_indemnity: i64,
    pub training_indemnity: i64,

    pub production_bonus: i64,
    pub attendance_bonus: i64,
    pub seniority_bonus: i64,
    pub elite_bonus: i64,
    pub responsibility_bonus: i64,

    pub meal_allowance: i64,
    pub transport_allowance: i64,

    pub gross_pay: i64,

    pub salary_advance: i64,
    /// 1% health insurance fund share.
    pub health_fund: i64,
    /// 1% social security fund share.
    pub pension_fund: i64,
    pub social_contribution: i64,
    pub income_tax: i64,

    pub net_pay: i64,

    pub working_days: u32,
    pub theoretical_hours: f64,
    pub attendance_percentage: f64,
}
