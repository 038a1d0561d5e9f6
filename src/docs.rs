use crate::api::attendance::{GridEmployee, MonthGrid, OffDaySync, PeriodRequest, UpdateAttendance};
use crate::api::clocking::{ClockHistory, ClockInRequest, ClockOutRequest, HistoryEntry, HistoryQuery};
use crate::api::employee::EmployeeListResponse;
use crate::api::payroll::{
    CalculateQuery, ExportRequest, ExportTotals, PayrollRun, PayrollStatistics, StatisticsQuery,
};
use crate::api::planning::UpdateShift;
use crate::model::adjustment::SalaryAdjustment;
use crate::model::attendance::AttendanceCode;
use crate::model::clocking::ClockRecord;
use crate::model::employee::Employee;
use crate::model::payslip::Payslip;
use crate::model::planning::ShiftCode;
use crate::payroll::AccrualSummary;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Colarys Payroll API",
        version = "1.0.0",
        description = r#"
## Colarys payroll engine

Monthly payroll for a call-center workforce.

### Key Features
- **Employee registry**: register, merge-update and remove employees
- **Attendance**: one code per employee-day (`p n a c m f o`), planned off days sync
- **Planning**: imported shifts give the length of each worked day
- **Payroll**: payslips with premiums, allowances, social funds and progressive tax
- **Clock**: daily clock-in/clock-out with signatures and worked hours
- **Leave**: monthly accrual of 2.5 days

### Security
Every `/api` endpoint expects a **JWT Bearer** access token issued by the
identity service. Most operations are restricted to **HR** and **Admin**.
"#,
    ),
    paths(
        crate::api::health::health,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::month_grid,
        crate::api::attendance::update_attendance,
        crate::api::attendance::sync_off_days_handler,

        crate::api::planning::update_shift,

        crate::api::payroll::calculate_payroll,
        crate::api::payroll::list_adjustments,
        crate::api::payroll::update_adjustment,
        crate::api::payroll::export_payslips,
        crate::api::payroll::statistics,

        crate::api::clocking::clock_in,
        crate::api::clocking::clock_out,
        crate::api::clocking::today_record,
        crate::api::clocking::history,

        crate::api::leave::accrue_leave
    ),
    components(
        schemas(
            Employee,
            EmployeeListResponse,
            AttendanceCode,
            UpdateAttendance,
            PeriodRequest,
            GridEmployee,
            MonthGrid,
            OffDaySync,
            ShiftCode,
            UpdateShift,
            SalaryAdjustment,
            Payslip,
            CalculateQuery,
            PayrollRun,
            ExportRequest,
            ExportTotals,
            StatisticsQuery,
            PayrollStatistics,
            AccrualSummary,
            ClockRecord,
            ClockInRequest,
            ClockOutRequest,
            HistoryQuery,
            HistoryEntry,
            ClockHistory
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Employee", description = "Employee registry APIs"),
        (name = "Attendance", description = "Daily attendance APIs"),
        (name = "Planning", description = "Shift planning APIs"),
        (name = "Payroll", description = "Payroll calculation APIs"),
        (name = "Clock", description = "Clock-in/clock-out APIs"),
        (name = "Leave", description = "Leave balance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
