//! Append-only user activity audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerpay_core::{TenantId, UserId};

/// One audit entry. Written on every state transition, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub id: Uuid,
    pub tenant_id: TenantId,
    /// Document table the activity belongs to (e.g. "PaymentOrder").
    pub table_type: String,
    pub table_id: Uuid,
    /// Document number at the time of the activity.
    pub number: String,
    pub user_id: UserId,
    /// Activity label, e.g. "Created", "Update - 1", "Approved", "Cancelled".
    pub activity: String,
    pub at: DateTime<Utc>,
}

impl UserActivity {
    pub fn new(
        tenant_id: TenantId,
        table_type: impl Into<String>,
        table_id: Uuid,
        number: impl Into<String>,
        user_id: UserId,
        activity: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            table_type: table_type.into(),
            table_id,
            number: number.into(),
            user_id,
            activity: activity.into(),
            at,
        }
    }
}
