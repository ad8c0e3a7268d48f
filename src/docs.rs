use crate::api::attendance::{AttendanceView, CheckInRequest};
use crate::api::leave::{CreateLeave, LeaveDecision, LeaveType, ResubmitLeave};
use crate::api::schedule::UpdateSchedule;
use crate::model::leave::LeaveRequest;
use crate::model::schedule::AttendanceSchedule;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presensi QR API",
        version = "1.0.0",
        description = r#"
## QR Attendance Backend

Backend for QR-scan attendance tracking with daily time windows and a leave
request ("izin") approval workflow.

### 🔹 Key Features
- **QR Tokens**
  - Short-lived one-time scan tokens rendered as PNG QR codes
- **Attendance**
  - Check-in, break start/end, and check-out against the configured windows
- **Schedule**
  - Versioned daily window configuration
- **Leave**
  - File, decide, and resubmit leave requests

### 🔐 Security
Check actions and administrative endpoints require the **JWT Bearer token**
issued by the organization's SSO.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::generate_qr,
        crate::api::attendance::check_in,
        crate::api::attendance::all_attendance,
        crate::api::attendance::attendance_by_user,
        crate::api::attendance::attendance_by_id,

        crate::api::schedule::list_schedules,
        crate::api::schedule::current_schedule,
        crate::api::schedule::update_schedule,

        crate::api::leave::create_leave,
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::leave_history,
        crate::api::leave::decide_leave,
        crate::api::leave::resubmit_leave,

        crate::api::health::health
    ),
    components(
        schemas(
            CheckInRequest,
            AttendanceView,
            AttendanceSchedule,
            UpdateSchedule,
            LeaveRequest,
            LeaveType,
            CreateLeave,
            LeaveDecision,
            ResubmitLeave
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "QR token and check-action APIs"),
        (name = "Schedule", description = "Daily window configuration APIs"),
        (name = "Leave", description = "Leave request workflow APIs"),
        (name = "Health", description = "Service health probe"),
    )
)]
pub struct ApiDoc;

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
