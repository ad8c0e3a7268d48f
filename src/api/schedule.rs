use crate::auth::auth::AuthUser;
use crate::model::schedule::AttendanceSchedule;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveTime, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

const SELECT_SCHEDULE: &str = r#"
    SELECT id, check_in_deadline, break_start_time, break_end_time, check_out_time, updated_at
    FROM attendance_settings
"#;

/// Replacement daily windows. Posting appends a new version; the previous
/// ones stay as history.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchedule {
    #[schema(example = "08:00:00", value_type = String)]
    pub check_in_deadline: NaiveTime,
    #[schema(example = "12:00:00", value_type = String)]
    pub break_start_time: NaiveTime,
    #[schema(example = "13:00:00", value_type = String)]
    pub break_end_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String)]
    pub check_out_time: NaiveTime,
}

/// All schedule versions
#[utoipa::path(
    get,
    path = "/api/v1/schedule",
    responses(
        (status = 200, description = "Every schedule version, newest first", body = [AttendanceSchedule]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn list_schedules(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let schedules = sqlx::query_as::<_, AttendanceSchedule>(
        &format!("{SELECT_SCHEDULE} ORDER BY updated_at DESC"),
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to list schedules");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(schedules))
}

/// Currently active schedule
#[utoipa::path(
    get,
    path = "/api/v1/schedule/current",
    responses(
        (status = 200, description = "The active schedule version", body = AttendanceSchedule),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No schedule configured yet")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn current_schedule(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let current = sqlx::query_as::<_, AttendanceSchedule>(
        &format!("{SELECT_SCHEDULE} ORDER BY updated_at DESC LIMIT 1"),
    )
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch current schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match current {
        Some(schedule) => Ok(HttpResponse::Ok().json(schedule)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "No schedule configured."
        }))),
    }
}

/// Append a new schedule version
#[utoipa::path(
    post,
    path = "/api/v1/schedule",
    request_body(
        content = UpdateSchedule,
        description = "The four daily window boundaries",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Schedule updated", body = Object, example = json!({
            "message": "Attendance schedule updated."
        })),
        (status = 400, description = "Boundaries out of order"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedule"
)]
pub async fn update_schedule(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateSchedule>,
) -> actix_web::Result<impl Responder> {
    let ordered = payload.check_in_deadline < payload.break_start_time
        && payload.break_start_time < payload.break_end_time
        && payload.break_end_time < payload.check_out_time;
    if !ordered {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Boundaries must be in order: check-in < break start < break end < check-out"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO attendance_settings
            (check_in_deadline, break_start_time, break_end_time, check_out_time, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.check_in_deadline)
    .bind(payload.break_start_time)
    .bind(payload.break_end_time)
    .bind(payload.check_out_time)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to insert schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance schedule updated."
    })))
}
