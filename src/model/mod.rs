pub mod adjustment;
pub mod attendance;
pub mod clocking;
pub mod employee;
pub mod payslip;
pub mod planning;
pub mod role;
