use crate::api::access::{VerifyAccessRequest, VerifyAccessResponse};
use crate::api::access_log::{
    AccessLogListResponse, AccessLogQuery, EditTimeReq, EditTimeResponse,
};
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee,
};
use crate::api::report::{DayWorkedView, WorkedHoursQuery, WorkedHoursResponse};
use crate::auth::handlers::{KioskCredentials, LoginResponse, ProvisionKioskReq};
use crate::model::access_log::{AccessLogEntry, ActionKind};
use crate::model::access_log_edit::AccessLogEdit;
use crate::model::employee::Employee;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Faceclock API",
        version = "1.0.0",
        description = r#"
## Biometric Attendance & Access Control

This API powers a facial-recognition attendance system: kiosk terminals
verify a live face against the organization's enrolled employees and
register check-ins/check-outs in an append-only ledger.

### 🔹 Key Features
- **Access Verification**
  - Face-verified check-in / check-out from provisioned kiosk terminals
  - Forgotten check-outs are auto-closed at end-of-day on the next check-in
- **Employee Directory**
  - Enroll employees with a face photo, search and manage profiles
- **Ledger Review & Audit**
  - Browse attendance logs, correct entry times with a mandatory reason
  - Every correction is recorded in a tamper-evident edit history
- **Reports**
  - Per-employee worked hours with per-day breakdown

### 🔐 Security
All operational endpoints are protected using **JWT Bearer authentication**.
Kiosk terminals use restricted accounts that can only register access;
ledger review, edits and reports require the **Admin** role. All data is
scoped to the caller's organization.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::provision_kiosk,

        crate::api::access::verify_access,

        crate::api::access_log::list_access_logs,
        crate::api::access_log::edit_entry_time,
        crate::api::access_log::edit_history,

        crate::api::report::worked_hours,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            ProvisionKioskReq,
            KioskCredentials,
            VerifyAccessRequest,
            VerifyAccessResponse,
            ActionKind,
            AccessLogEntry,
            AccessLogEdit,
            AccessLogQuery,
            AccessLogListResponse,
            EditTimeReq,
            EditTimeResponse,
            WorkedHoursQuery,
            WorkedHoursResponse,
            DayWorkedView,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication and kiosk provisioning"),
        (name = "Access", description = "Face-verified attendance registration"),
        (name = "AccessLog", description = "Ledger review and audited corrections"),
        (name = "Reports", description = "Worked-hours reporting"),
        (name = "Employee", description = "Employee directory management"),
        (name = "Kiosk", description = "Kiosk terminal provisioning"),
    )
)]
pub struct ApiDoc;
