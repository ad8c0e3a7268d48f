use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset};
use qrcode::{EcLevel, QrCode};
use uuid::Uuid;

use crate::core::clock::{Clock, ReferenceZone};

/// Pixels per QR module in the rendered PNG.
const QR_MODULE_PIXELS: u32 = 20;

/// A freshly minted scan token plus its QR rendering.
pub struct IssuedToken {
    pub token: String,
    pub png: Vec<u8>,
}

/// Owns the registry of live one-time scan tokens.
///
/// Tokens are minted on demand for the kiosk display, consumed on the first
/// accepted check action, and otherwise expire passively after the TTL.
/// The registry is the only shared mutable state in the process; every
/// read-modify-write on it happens under one lock acquisition, and the lock
/// is never held across I/O. Eviction of expired entries is lazy (done
/// during validation), no sweeper task exists.
pub struct TokenAuthority {
    registry: Mutex<HashMap<String, DateTime<FixedOffset>>>,
    zone: ReferenceZone,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    pub fn new(zone: ReferenceZone, ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            zone,
            ttl: Duration::seconds(ttl_secs),
            clock,
        }
    }

    /// Mint a new token and render it as a PNG QR code.
    ///
    /// Several tokens may be outstanding at once; they are unrelated.
    pub fn issue(&self) -> Result<IssuedToken> {
        let token = random_token();
        let png = render_qr_png(&token)?;

        let expires_at = self.now_local() + self.ttl;
        self.lock_registry().insert(token.clone(), expires_at);

        tracing::debug!(%token, %expires_at, "QR token issued");
        Ok(IssuedToken { token, png })
    }

    /// True iff the token is known and not past its expiry. An expired
    /// entry found here is evicted on the spot.
    pub fn validate(&self, token: &str) -> bool {
        let now = self.now_local();
        let mut registry = self.lock_registry();
        match registry.get(token) {
            Some(expires_at) if now <= *expires_at => true,
            Some(_) => {
                registry.remove(token);
                false
            }
            None => false,
        }
    }

    /// Retire a token unconditionally. Removing an absent token is a no-op.
    pub fn invalidate(&self, token: &str) {
        self.lock_registry().remove(token);
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.zone.to_local(self.clock.now_utc())
    }

    fn lock_registry(&self) -> MutexGuard<'_, HashMap<String, DateTime<FixedOffset>>> {
        // A panic while holding the lock leaves the map intact, so a
        // poisoned guard is still safe to use.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 16 random bytes as 8 hyphen-separated groups of 4 hex characters.
/// The segmentation keeps the QR payload in compact alphanumeric mode;
/// it carries no structural meaning.
fn random_token() -> String {
    let bytes = *Uuid::new_v4().as_bytes();
    let mut out = String::with_capacity(39);
    for (i, pair) in bytes.chunks(2).enumerate() {
        if i > 0 {
            out.push('-');
        }
        let _ = write!(out, "{:02X}{:02X}", pair[0], pair[1]);
    }
    out
}

fn render_qr_png(token: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::Q)
        .context("QR encode failed")?;

    let bitmap = code
        .render::<image::Luma<u8>>()
        .module_dimensions(QR_MODULE_PIXELS, QR_MODULE_PIXELS)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(bitmap)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("PNG encode failed")?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::core::clock::testing::ManualClock;

    fn authority_with_clock() -> (TokenAuthority, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap(),
        ));
        let zone = ReferenceZone::from_offset_hours(7).unwrap();
        (TokenAuthority::new(zone, 60, clock.clone()), clock)
    }

    #[test]
    fn issued_token_validates_until_invalidated() {
        let (authority, _clock) = authority_with_clock();
        let issued = authority.issue().unwrap();

        assert!(authority.validate(&issued.token));
        authority.invalidate(&issued.token);
        assert!(!authority.validate(&issued.token));
    }

    #[test]
    fn token_expires_after_ttl() {
        let (authority, clock) = authority_with_clock();
        let issued = authority.issue().unwrap();

        clock.advance_secs(60);
        assert!(authority.validate(&issued.token), "expiry is inclusive");

        clock.advance_secs(1);
        assert!(!authority.validate(&issued.token));
        // Eviction happened during the failed validation.
        assert!(!authority.validate(&issued.token));
    }

    #[test]
    fn unknown_token_never_validates() {
        let (authority, _clock) = authority_with_clock();
        assert!(!authority.validate("AAAA-BBBB-CCCC-DDDD-EEEE-FFFF-0000-1111"));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let (authority, _clock) = authority_with_clock();
        let issued = authority.issue().unwrap();
        authority.invalidate(&issued.token);
        authority.invalidate(&issued.token);
        assert!(!authority.validate(&issued.token));
    }

    #[test]
    fn successive_tokens_are_distinct() {
        let (authority, _clock) = authority_with_clock();
        let a = authority.issue().unwrap();
        let b = authority.issue().unwrap();
        assert_ne!(a.token, b.token);
        // Both stay live concurrently.
        assert!(authority.validate(&a.token));
        assert!(authority.validate(&b.token));
    }

    #[test]
    fn denied_transition_never_consumes_the_token() {
        use crate::core::state_machine::{self, DayWindows};
        use crate::model::schedule::AttendanceSchedule;
        use chrono::NaiveTime;

        let (authority, clock) = authority_with_clock();
        let issued = authority.issue().unwrap();

        // The clock sits at 08:00 in the reference zone; with the morning
        // window already closed, a first check-in is denied.
        let schedule = AttendanceSchedule {
            id: 1,
            check_in_deadline: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            break_start_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            break_end_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            check_out_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let zone = ReferenceZone::from_offset_hours(7).unwrap();
        let now_utc = clock.now_utc();
        let windows = DayWindows::for_day(&schedule, zone.day_start(now_utc));

        let decision = state_machine::evaluate(None, &windows, zone.to_local(now_utc));
        assert!(decision.is_err());

        // Only an accepted transition retires the token; a denial leaves it
        // live for a retry until the TTL runs out on its own.
        assert!(authority.validate(&issued.token));
    }

    #[test]
    fn token_format_is_segmented_hex() {
        let token = random_token();
        let groups: Vec<&str> = token.split('-').collect();
        assert_eq!(groups.len(), 8);
        for group in groups {
            assert_eq!(group.len(), 4);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn qr_render_produces_png() {
        let png = render_qr_png("0123-4567-89AB-CDEF-0123-4567-89AB-CDEF").unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
