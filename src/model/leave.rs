use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_name: String,
    pub leave_type: String,
    pub reason: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    /// Monthly sequential code, `YYMMnnn`.
    pub code: String,
    pub submitted_at: DateTime<Utc>,
}
