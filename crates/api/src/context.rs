//! Per-request tenant/actor context.
//!
//! The identity provider is external to this service; requests arrive with
//! the already-authenticated tenant and user ids in headers, injected by
//! the gateway in front of us.

use ledgerpay_core::{TenantId, UserId};

/// Request header carrying the tenant id.
pub const TENANT_HEADER: &str = "x-tenant-id";
/// Request header carrying the acting user id.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}
