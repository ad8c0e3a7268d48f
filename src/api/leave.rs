use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveRequest;
use crate::notify::{self, LeaveDecisionEvent, Notifier};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

const SELECT_LEAVE: &str = r#"
    SELECT id, user_name, leave_type, reason, start_date, end_date, status, code, submitted_at
    FROM leave_requests
"#;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Izin,
    Sakit,
    Dinas,
}

impl LeaveType {
    fn as_str(&self) -> &str {
        match self {
            LeaveType::Izin => "izin",
            LeaveType::Sakit => "sakit",
            LeaveType::Dinas => "dinas",
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeave {
    #[schema(example = "sakit")]
    pub leave_type: LeaveType,
    #[schema(example = "Demam, disarankan istirahat oleh dokter")]
    pub reason: String,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveDecision {
    /// One of: approved, rejected, revise
    #[schema(example = "approved")]
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResubmitLeave {
    pub reason: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

/// Decisions apply while the request is still with the approver, which
/// includes items sent back for revision (an approver may reject outright
/// instead of waiting for the resubmission).
fn decidable(status: &str) -> bool {
    matches!(status, "pending" | "revise")
}

/// Ordering check against the dates a revision would leave in place.
fn revised_span_ordered(
    current_start: NaiveDate,
    current_end: Option<NaiveDate>,
    new_start: Option<NaiveDate>,
    new_end: Option<NaiveDate>,
) -> bool {
    let start = new_start.unwrap_or(current_start);
    match new_end.or(current_end) {
        Some(end) => start <= end,
        None => true,
    }
}

/// Next monthly code, `YYMMnnn`. Sequence restarts each month.
async fn next_leave_code(pool: &MySqlPool, today: NaiveDate) -> Result<String, sqlx::Error> {
    let prefix = format!("{:02}{:02}", today.year() % 100, today.month());

    let last: Option<String> = sqlx::query_scalar(
        "SELECT code FROM leave_requests WHERE code LIKE ? ORDER BY code DESC LIMIT 1",
    )
    .bind(format!("{prefix}%"))
    .fetch_optional(pool)
    .await?;

    let next = last
        .and_then(|code| code.get(4..).and_then(|n| n.parse::<u32>().ok()))
        .map_or(1, |n| n + 1);

    Ok(format!("{prefix}{next:03}"))
}

/// File a leave request
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "code": "2601001",
            "status": "pending"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    if payload.reason.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Reason must not be empty"
        })));
    }

    if let Some(end) = payload.end_date {
        if payload.start_date > end {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "start_date cannot be after end_date"
            })));
        }
    }

    let now = Utc::now();
    let code = next_leave_code(pool.get_ref(), now.date_naive())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to derive leave code");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_name, leave_type, reason, start_date, end_date, status, code, submitted_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&auth.username)
    .bind(payload.leave_type.as_str())
    .bind(payload.reason.trim())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&code)
    .bind(now)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user = %auth.username, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request submitted",
        "code": code,
        "status": "pending"
    })))
}

/// All leave requests
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    responses(
        (status = 200, description = "All leave requests, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let leaves = sqlx::query_as::<_, LeaveRequest>(
        &format!("{SELECT_LEAVE} ORDER BY submitted_at DESC"),
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch leave list");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(leaves))
}

/// One leave request
#[utoipa::path(
    get,
    path = "/api/v1/leave/{id}",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveRequest>(&format!("{SELECT_LEAVE} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, id, "Failed to fetch leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/// Leave history of one user
#[utoipa::path(
    get,
    path = "/api/v1/leave/history/{user_name}",
    params(
        ("user_name" = String, Path, description = "User to fetch leave history for")
    ),
    responses(
        (status = 200, description = "Leave history, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_history(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let user_name = path.into_inner();

    let leaves = sqlx::query_as::<_, LeaveRequest>(
        &format!("{SELECT_LEAVE} WHERE user_name = ? ORDER BY submitted_at DESC"),
    )
    .bind(&user_name)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_name = %user_name, "Failed to fetch leave history");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(leaves))
}

/// Decide on a pending leave request
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/status",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    request_body(content = LeaveDecision, content_type = "application/json"),
    responses(
        (status = 200, description = "Decision recorded", body = Object, example = json!({
            "message": "Leave approved",
            "id": 1,
            "status": "approved"
        })),
        (status = 400, description = "Invalid status or request not pending"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn decide_leave(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<dyn Notifier>,
    path: web::Path<u64>,
    payload: web::Json<LeaveDecision>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let status = payload.status.as_str();

    if !matches!(status, "approved" | "rejected" | "revise") {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Status must be approved, rejected, or revise"
        })));
    }

    let row: Option<(String, String)> =
        sqlx::query_as("SELECT user_name, status FROM leave_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, id, "Failed to fetch leave request");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let Some((user_name, current_status)) = row else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        })));
    };

    if !decidable(&current_status) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request is already processed"
        })));
    }

    let result = sqlx::query(
        "UPDATE leave_requests SET status = ? WHERE id = ? AND status IN ('pending', 'revise')",
    )
    .bind(status)
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, id, "Leave decision failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request not found or already processed"
        })));
    }

    notify::dispatch_leave_decision(
        notifier.into_inner(),
        LeaveDecisionEvent {
            leave_id: id,
            user_name,
            status: status.to_string(),
        },
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Leave {status}"),
        "id": id,
        "status": status
    })))
}

/// Resubmit a leave request sent back for revision
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/resubmit",
    params(
        ("id" = u64, Path, description = "Leave request ID")
    ),
    request_body(content = ResubmitLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Request back to pending", body = Object, example = json!({
            "message": "Leave request resubmitted",
            "id": 1,
            "status": "pending"
        })),
        (status = 400, description = "Request is not in revise state or nothing changed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn resubmit_leave(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ResubmitLeave>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let has_changes = payload.reason.as_deref().is_some_and(|r| !r.trim().is_empty())
        || payload.start_date.is_some()
        || payload.end_date.is_some();
    if !has_changes {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "At least one field must be revised"
        })));
    }

    let current: Option<(NaiveDate, Option<NaiveDate>, String)> =
        sqlx::query_as("SELECT start_date, end_date, status FROM leave_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, id, "Failed to fetch leave request");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let Some((current_start, current_end, status)) = current else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        })));
    };

    if status != "revise" {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Resubmission is only allowed while the request is in revise state"
        })));
    }

    if !revised_span_ordered(current_start, current_end, payload.start_date, payload.end_date) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET reason = COALESCE(?, reason),
            start_date = COALESCE(?, start_date),
            end_date = COALESCE(?, end_date),
            status = 'pending'
        WHERE id = ?
        AND status = 'revise'
        "#,
    )
    .bind(
        payload
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty()),
    )
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, id, "Leave resubmission failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Resubmission is only allowed while the request is in revise state"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request resubmitted",
        "id": id,
        "status": "pending"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_apply_to_pending_and_revise() {
        assert!(decidable("pending"));
        assert!(decidable("revise"));
        assert!(!decidable("approved"));
        assert!(!decidable("rejected"));
    }

    #[test]
    fn revision_keeps_dates_ordered() {
        let d = |m: u32, day: u32| NaiveDate::from_ymd_opt(2026, m, day).unwrap();
        let start = d(1, 6);
        let end = Some(d(1, 7));

        // Moving only the start past the kept end is rejected.
        assert!(!revised_span_ordered(start, end, Some(d(1, 8)), None));
        assert!(revised_span_ordered(start, end, Some(d(1, 7)), None));
        // Moving only the end before the kept start is rejected.
        assert!(!revised_span_ordered(start, end, None, Some(d(1, 5))));
        assert!(revised_span_ordered(start, end, None, Some(d(1, 6))));
        // Open-ended requests have no upper bound to violate.
        assert!(revised_span_ordered(start, None, Some(d(2, 1)), None));
    }
}
