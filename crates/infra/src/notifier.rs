//! Approval-request notifications.
//!
//! Notification delivery is fire-and-forget: a failed or missing channel
//! never fails the settlement write. Implementations log what they cannot
//! deliver and move on.

use std::sync::RwLock;
use std::time::Duration;

use ledgerpay_core::{TenantId, UserId};

/// Reminder schedule attached to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    pub every: Duration,
    /// Maximum number of reminders after the initial notification.
    pub limit: u32,
}

impl RepeatPolicy {
    /// Daily reminder, capped at `limit` repeats.
    pub fn daily(limit: u32) -> Self {
        Self {
            every: Duration::from_secs(24 * 60 * 60),
            limit,
        }
    }
}

/// One approval-request notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub tenant_id: TenantId,
    pub form_number: String,
    pub approver: UserId,
    pub message: String,
    pub repeat: Option<RepeatPolicy>,
}

/// Delivery channel for approval requests.
///
/// `enqueue` is infallible on purpose: the caller has already committed
/// the settlement and must not roll back over a notification problem.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, request: NotificationRequest);
}

/// Channel that only logs. Stands in where no real delivery is wired up.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn enqueue(&self, request: NotificationRequest) {
        tracing::info!(
            form_number = %request.form_number,
            approver = %request.approver,
            repeats = request.repeat.map(|r| r.limit),
            "approval notification enqueued: {}",
            request.message
        );
    }
}

/// Test channel that records every request.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, request: NotificationRequest) {
        if let Ok(mut sent) = self.sent.write() {
            sent.push(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_policy_spans_a_day() {
        let policy = RepeatPolicy::daily(7);
        assert_eq!(policy.every, Duration::from_secs(86_400));
        assert_eq!(policy.limit, 7);
    }

    #[test]
    fn recording_notifier_captures_requests() {
        let notifier = RecordingNotifier::new();
        notifier.enqueue(NotificationRequest {
            tenant_id: TenantId::new(),
            form_number: "PP2101001".to_string(),
            approver: UserId::new(),
            message: "PP2101001 needs your approval".to_string(),
            repeat: Some(RepeatPolicy::daily(7)),
        });

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].form_number, "PP2101001");
    }
}
