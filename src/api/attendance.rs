use crate::auth::auth::AuthUser;
use crate::core::clock::{Clock, ReferenceZone};
use crate::core::state_machine::{self, DayWindows, Transition};
use crate::core::token::TokenAuthority;
use crate::model::attendance::AttendanceRecord;
use crate::model::schedule::AttendanceSchedule;
use crate::notify::{self, CheckInEvent, Notifier};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

const ZERO_MAC: &str = "00:00:00:00:00:00";

const SELECT_RECORD: &str = r#"
    SELECT id, user_name, day, ip_address, mac_address, device_name, status,
           check_in_time, break_start_time, break_end_time, check_out_time
    FROM attendance
"#;

/// What the mobile client submits after scanning the kiosk QR.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[schema(example = "A1B2-C3D4-E5F6-A7B8-C9D0-E1F2-A3B4-C5D6")]
    pub token: String,
    #[schema(example = "budi")]
    pub user_name: String,
    #[schema(example = "Pixel 7")]
    pub device_name: Option<String>,
    #[schema(example = "10.0.12.34")]
    pub mobile_ip_address: Option<String>,
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub mac_address: Option<String>,
}

/// Attendance row with instants converted to the reference zone for display.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "budi")]
    pub user_name: String,
    #[schema(example = "2026-01-05", value_type = String)]
    pub day: NaiveDate,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub device_name: Option<String>,
    #[schema(example = "on time")]
    pub status: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub check_in_time: DateTime<FixedOffset>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub break_start_time: Option<DateTime<FixedOffset>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub break_end_time: Option<DateTime<FixedOffset>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<FixedOffset>>,
}

impl AttendanceView {
    fn from_record(record: AttendanceRecord, zone: &ReferenceZone) -> Self {
        Self {
            id: record.id,
            user_name: record.user_name,
            day: record.day,
            ip_address: record.ip_address,
            mac_address: record.mac_address,
            device_name: record.device_name,
            status: record.status,
            check_in_time: zone.to_local(record.check_in_time),
            break_start_time: record.break_start_time.map(|t| zone.to_local(t)),
            break_end_time: record.break_end_time.map(|t| zone.to_local(t)),
            check_out_time: record.check_out_time.map(|t| zone.to_local(t)),
        }
    }
}

/// QR image endpoint for the kiosk display
#[utoipa::path(
    get,
    path = "/attendance/qr",
    responses(
        (status = 200, description = "PNG image of a freshly issued scan token", body = Vec<u8>, content_type = "image/png"),
        (status = 500, description = "Failed to generate QR code")
    ),
    tag = "Attendance"
)]
pub async fn generate_qr(tokens: web::Data<TokenAuthority>) -> impl Responder {
    match tokens.issue() {
        Ok(issued) => HttpResponse::Ok()
            .content_type("image/png")
            .body(issued.png),
        Err(e) => {
            tracing::error!(error = %e, "QR generation failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Failed to generate QR code."
            }))
        }
    }
}

/// Check-action endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body(
        content = CheckInRequest,
        description = "Scanned token plus device identity",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Transition accepted", body = Object, example = json!({
            "success": true,
            "message": "Checked in: on time.",
            "recordId": 1
        })),
        (status = 400, description = "Validation, token, or window failure", body = Object, example = json!({
            "success": false,
            "message": "Not yet time for break."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent scan already recorded this stage"),
        (status = 500, description = "Schedule missing or persistence failure")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    tokens: web::Data<TokenAuthority>,
    clock: web::Data<dyn Clock>,
    zone: web::Data<ReferenceZone>,
    notifier: web::Data<dyn Notifier>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let user_name = payload.user_name.trim();
    if user_name.is_empty() {
        return Ok(reject("UserName is required."));
    }

    match payload.mac_address.as_deref() {
        None | Some("") | Some(ZERO_MAC) => {
            return Ok(reject("Invalid or missing device identifier."));
        }
        Some(_) => {}
    }

    if !tokens.validate(&payload.token) {
        return Ok(reject("Invalid or expired QR token."));
    }

    // Latest schedule version wins; without one, windows cannot be evaluated.
    let schedule = sqlx::query_as::<_, AttendanceSchedule>(
        r#"
        SELECT id, check_in_deadline, break_start_time, break_end_time, check_out_time, updated_at
        FROM attendance_settings
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to load attendance schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(schedule) = schedule else {
        return Ok(HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Attendance schedule is not configured."
        })));
    };

    let now_utc = clock.now_utc();
    let day_start = zone.day_start(now_utc);
    let now_local = zone.to_local(now_utc);
    let today = day_start.date_naive();
    let windows = DayWindows::for_day(&schedule, day_start);

    let existing = sqlx::query_as::<_, AttendanceRecord>(
        &format!("{SELECT_RECORD} WHERE user_name = ? AND day = ?"),
    )
    .bind(user_name)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_name, "Failed to load attendance record");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let transition = match state_machine::evaluate(existing.as_ref(), &windows, now_local) {
        Ok(t) => t,
        // Rejection leaves both the record and the token untouched, so the
        // same scan can be retried until the token expires on its own.
        Err(denied) => return Ok(reject(&denied.to_string())),
    };

    let record_id = match (&transition, &existing) {
        (Transition::CheckIn(status), _) => {
            let result = sqlx::query(
                r#"
                INSERT INTO attendance
                    (user_name, day, ip_address, mac_address, device_name, status, check_in_time)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_name)
            .bind(today)
            .bind(&payload.mobile_ip_address)
            .bind(&payload.mac_address)
            .bind(&payload.device_name)
            .bind(status.to_string())
            .bind(now_utc)
            .execute(pool.get_ref())
            .await;

            match result {
                Ok(done) => {
                    notify::dispatch_check_in(
                        notifier.clone().into_inner(),
                        CheckInEvent {
                            user_name: user_name.to_string(),
                            check_in_time: now_local,
                        },
                    );
                    done.last_insert_id()
                }
                Err(e) => {
                    // Unique (user_name, day): a concurrent first scan won.
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.code().as_deref() == Some("23000") {
                            return Ok(HttpResponse::Conflict().json(serde_json::json!({
                                "success": false,
                                "message": "Check-in already recorded for today."
                            })));
                        }
                    }
                    tracing::error!(error = %e, user_name, "Check-in insert failed");
                    return Err(actix_web::error::ErrorInternalServerError(
                        "Internal Server Error",
                    ));
                }
            }
        }
        (stage, Some(record)) => {
            // The `IS NULL` guard is the serialization point for two
            // simultaneous scans of the same stage.
            let sql = match stage {
                Transition::BreakStart => {
                    "UPDATE attendance SET break_start_time = ? WHERE id = ? AND break_start_time IS NULL"
                }
                Transition::BreakEnd(_) => {
                    "UPDATE attendance SET break_end_time = ? WHERE id = ? AND break_end_time IS NULL"
                }
                Transition::CheckOut => {
                    "UPDATE attendance SET check_out_time = ? WHERE id = ? AND check_out_time IS NULL"
                }
                Transition::CheckIn(_) => unreachable!("insert branch handles first check-in"),
            };

            let result = sqlx::query(sql)
                .bind(now_utc)
                .bind(record.id)
                .execute(pool.get_ref())
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, record_id = record.id, "Stage update failed");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;

            if result.rows_affected() == 0 {
                return Ok(HttpResponse::Conflict().json(serde_json::json!({
                    "success": false,
                    "message": "Another scan already recorded this stage."
                })));
            }
            record.id
        }
        (_, None) => {
            tracing::error!(user_name, "Evaluated a stage update without a record");
            return Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ));
        }
    };

    // Accepted transitions always consume the token.
    tokens.invalidate(&payload.token);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": transition.message(),
        "recordId": record_id
    })))
}

fn reject(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "message": message
    }))
}

/// All attendance records
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    responses(
        (status = 200, description = "All attendance records", body = [AttendanceView]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn all_attendance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    zone: web::Data<ReferenceZone>,
) -> actix_web::Result<impl Responder> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        &format!("{SELECT_RECORD} ORDER BY check_in_time DESC"),
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to list attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let views: Vec<AttendanceView> = records
        .into_iter()
        .map(|r| AttendanceView::from_record(r, &zone))
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Attendance history of one user
#[utoipa::path(
    get,
    path = "/api/v1/attendance/user/{user_name}",
    params(
        ("user_name" = String, Path, description = "User to fetch records for")
    ),
    responses(
        (status = 200, description = "Records for the user", body = [AttendanceView]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No records for this user")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_by_user(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    zone: web::Data<ReferenceZone>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let user_name = path.into_inner();

    let records = sqlx::query_as::<_, AttendanceRecord>(
        &format!("{SELECT_RECORD} WHERE user_name = ? ORDER BY check_in_time DESC"),
    )
    .bind(&user_name)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_name = %user_name, "Failed to fetch attendance by user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if records.is_empty() {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("No attendance records found for user {user_name}.")
        })));
    }

    let views: Vec<AttendanceView> = records
        .into_iter()
        .map(|r| AttendanceView::from_record(r, &zone))
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Single attendance record
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "The record", body = AttendanceView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No record with this ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_by_id(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    zone: web::Data<ReferenceZone>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let record = sqlx::query_as::<_, AttendanceRecord>(&format!("{SELECT_RECORD} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, id, "Failed to fetch attendance record");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match record {
        Some(r) => Ok(HttpResponse::Ok().json(AttendanceView::from_record(r, &zone))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("No attendance record found with ID {id}.")
        }))),
    }
}
