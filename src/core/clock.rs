use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Utc};

/// Source of "now". Injected so the token registry and the check-in
/// pipeline can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The fixed civil time zone all daily-window arithmetic happens in
/// (the organization's locale, WIB = UTC+7 by default). Storage stays UTC;
/// comparisons and day boundaries use this zone.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl ReferenceZone {
    pub fn from_offset_hours(hours: i32) -> Result<Self> {
        if !(-23..=23).contains(&hours) {
            bail!("UTC offset out of range: {hours}");
        }
        let offset =
            FixedOffset::east_opt(hours * 3600).context("invalid UTC offset")?;
        Ok(Self { offset })
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Midnight of the civil day containing `instant`, in this zone.
    pub fn day_start(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = self.to_local(instant);
        local - (local.time() - chrono::NaiveTime::MIN)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Test clock whose "now" is set explicitly.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }

        pub fn advance_secs(&self, secs: i64) {
            let mut guard = self.now.lock().unwrap();
            *guard += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now_utc(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn day_start_uses_reference_zone_not_utc() {
        let zone = ReferenceZone::from_offset_hours(7).unwrap();
        // 2025-03-09 23:30 UTC is already 2025-03-10 06:30 in WIB.
        let instant = Utc.with_ymd_and_hms(2025, 3, 9, 23, 30, 0).unwrap();
        let start = zone.day_start(instant);
        assert_eq!(start.date_naive().to_string(), "2025-03-10");
        assert_eq!(start.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn rejects_nonsense_offsets() {
        assert!(ReferenceZone::from_offset_hours(26).is_err());
        assert!(ReferenceZone::from_offset_hours(-7).is_ok());
    }
}
