use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One version of the daily window configuration. Versions are append-only;
/// the row with the greatest `updated_at` is the active one, older rows are
/// inert history.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSchedule {
    pub id: u64,
    pub check_in_deadline: NaiveTime,
    pub break_start_time: NaiveTime,
    pub break_end_time: NaiveTime,
    pub check_out_time: NaiveTime,
    pub updated_at: DateTime<Utc>,
}
