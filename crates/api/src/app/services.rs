//! Service wiring for the API process.
//!
//! The permission backend and user directory are external systems in a
//! full deployment. The standalone binary wires in permissive stand-ins
//! so the workflow can be exercised end to end; real directories are
//! injected here when embedding the router.

use std::sync::Arc;

use uuid::Uuid;

use ledgerpay_auth::{PermissionDirectory, UserDirectory, UserProfile};
use ledgerpay_core::{BranchId, UserId};
use ledgerpay_infra::{InMemoryStore, SettlementService, TracingNotifier};

pub struct AppServices {
    pub store: Arc<InMemoryStore>,
    pub settlements: SettlementService,
}

/// Grants every permission. Dev stand-in for the external RBAC backend.
struct OpenPermissions;

impl PermissionDirectory for OpenPermissions {
    fn has_permission(&self, _user_id: UserId, _module: &str, _action: &str) -> bool {
        true
    }
}

/// Treats every authenticated user as existing, with a default branch.
struct OpenUsers;

impl UserDirectory for OpenUsers {
    fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        Some(UserProfile::new(
            user_id,
            user_id.to_string(),
            Some(BranchId::from_uuid(Uuid::nil())),
        ))
    }
}

/// Standalone wiring: in-memory store, open directories, log-only notifier.
pub fn build_services() -> AppServices {
    let store = Arc::new(InMemoryStore::new());
    let settlements = SettlementService::new(
        Arc::clone(&store),
        Arc::new(OpenPermissions),
        Arc::new(OpenUsers),
        Arc::new(TracingNotifier),
    );
    AppServices { store, settlements }
}

/// Embedding wiring: caller-provided collaborators over a shared store.
pub fn build_services_with(
    store: Arc<InMemoryStore>,
    permissions: Arc<dyn PermissionDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn ledgerpay_infra::notifier::Notifier>,
) -> AppServices {
    let settlements = SettlementService::new(Arc::clone(&store), permissions, users, notifier);
    AppServices { store, settlements }
}
