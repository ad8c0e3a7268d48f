use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

/// Post-commit events. Dispatch is fire-and-forget: a failed hook is
/// logged and never rolls back or fails the transition it followed.
#[derive(Debug, Clone)]
pub struct CheckInEvent {
    pub user_name: String,
    pub check_in_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct LeaveDecisionEvent {
    pub leave_id: u64,
    pub user_name: String,
    pub status: String,
}

/// Delivery seam. The actual push transport (FCM, Telegram) lives outside
/// this service; in-repo the events land in the log.
pub trait Notifier: Send + Sync {
    fn notify_check_in(&self, event: &CheckInEvent) -> anyhow::Result<()>;
    fn notify_leave_decision(&self, event: &LeaveDecisionEvent) -> anyhow::Result<()>;
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_check_in(&self, event: &CheckInEvent) -> anyhow::Result<()> {
        tracing::info!(
            user = %event.user_name,
            time = %event.check_in_time,
            "check-in notification"
        );
        Ok(())
    }

    fn notify_leave_decision(&self, event: &LeaveDecisionEvent) -> anyhow::Result<()> {
        tracing::info!(
            leave_id = event.leave_id,
            user = %event.user_name,
            status = %event.status,
            "leave decision notification"
        );
        Ok(())
    }
}

pub fn dispatch_check_in(notifier: Arc<dyn Notifier>, event: CheckInEvent) {
    actix_web::rt::spawn(async move {
        if let Err(e) = notifier.notify_check_in(&event) {
            tracing::warn!(error = %e, user = %event.user_name, "check-in notification failed");
        }
    });
}

pub fn dispatch_leave_decision(notifier: Arc<dyn Notifier>, event: LeaveDecisionEvent) {
    actix_web::rt::spawn(async move {
        if let Err(e) = notifier.notify_leave_decision(&event) {
            tracing::warn!(error = %e, leave_id = event.leave_id, "leave decision notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::bail;
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    struct Recording {
        check_ins: Mutex<Vec<CheckInEvent>>,
        fail: bool,
    }

    impl Notifier for Recording {
        fn notify_check_in(&self, event: &CheckInEvent) -> anyhow::Result<()> {
            if self.fail {
                bail!("transport down");
            }
            self.check_ins.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn notify_leave_decision(&self, _event: &LeaveDecisionEvent) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn event() -> CheckInEvent {
        CheckInEvent {
            user_name: "budi".into(),
            check_in_time: FixedOffset::east_opt(7 * 3600)
                .unwrap()
                .with_ymd_and_hms(2025, 6, 2, 7, 45, 0)
                .unwrap(),
        }
    }

    #[actix_web::test]
    async fn dispatch_delivers_event() {
        let notifier = Arc::new(Recording {
            check_ins: Mutex::new(Vec::new()),
            fail: false,
        });
        dispatch_check_in(notifier.clone(), event());
        actix_web::rt::task::yield_now().await;
        assert_eq!(notifier.check_ins.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn dispatch_swallows_failures() {
        let notifier = Arc::new(Recording {
            check_ins: Mutex::new(Vec::new()),
            fail: true,
        });
        // Must not panic the task or surface anywhere.
        dispatch_check_in(notifier, event());
        actix_web::rt::task::yield_now().await;
    }
}
