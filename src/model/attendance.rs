use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row per user per civil day in the reference zone.
///
/// The four instants are stored in UTC and set in strict order, never
/// overwritten: at most one of them is written per accepted scan.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_name: String,
    pub day: NaiveDate,
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub device_name: Option<String>,
    pub status: Option<String>,
    pub check_in_time: DateTime<Utc>,
    pub break_start_time: Option<DateTime<Utc>>,
    pub break_end_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}
