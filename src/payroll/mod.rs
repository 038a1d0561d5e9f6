//! Payroll engine: attendance aggregation, working-days baseline, payslip
//! computation and leave accrual.

pub mod accrual;
pub mod aggregator;
pub mod calculator;
pub mod tax;
pub mod working_days;

pub use accrual::{AccrualSummary, accrue_all};
pub use calculator::PayrollCalculator;
