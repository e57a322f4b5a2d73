use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use ledgerpay_core::UserId;

/// Permission identifier.
///
/// Permissions are modeled as opaque `module.action` strings
/// (e.g. "purchase.payment-order.create"). A special wildcard permission
/// `"*"` can be used by policy layers to indicate "allow all" without
/// hardcoding domain permissions into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a permission from a module and an action, e.g.
    /// `Permission::of("purchase.payment-order", "create")`.
    pub fn of(module: &str, action: &str) -> Self {
        Self(Cow::Owned(format!("{module}.{action}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission check collaborator: `has_permission(user, module, action)`.
///
/// Implemented by the hosting application; the settlement service only
/// asks yes/no questions through this seam.
pub trait PermissionDirectory: Send + Sync {
    fn has_permission(&self, user_id: UserId, module: &str, action: &str) -> bool;
}

/// Fixed in-memory permission table (tests and single-process deployments).
#[derive(Debug, Default)]
pub struct StaticPermissions {
    grants: HashSet<(UserId, Permission)>,
    wildcard_users: HashSet<UserId>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, user_id: UserId, permission: Permission) {
        if permission.is_wildcard() {
            self.wildcard_users.insert(user_id);
        } else {
            self.grants.insert((user_id, permission));
        }
    }

    pub fn grant_all(&mut self, user_id: UserId) {
        self.wildcard_users.insert(user_id);
    }
}

impl PermissionDirectory for StaticPermissions {
    fn has_permission(&self, user_id: UserId, module: &str, action: &str) -> bool {
        if self.wildcard_users.contains(&user_id) {
            return true;
        }
        self.grants
            .contains(&(user_id, Permission::of(module, action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_of_joins_module_and_action() {
        let p = Permission::of("purchase.payment-order", "create");
        assert_eq!(p.as_str(), "purchase.payment-order.create");
    }

    #[test]
    fn static_permissions_check_exact_grants() {
        let user = UserId::new();
        let other = UserId::new();
        let mut perms = StaticPermissions::new();
        perms.grant(user, Permission::of("purchase.payment-order", "create"));

        assert!(perms.has_permission(user, "purchase.payment-order", "create"));
        assert!(!perms.has_permission(user, "purchase.payment-order", "delete"));
        assert!(!perms.has_permission(other, "purchase.payment-order", "create"));
    }

    #[test]
    fn wildcard_grant_allows_everything() {
        let user = UserId::new();
        let mut perms = StaticPermissions::new();
        perms.grant(user, Permission::new("*"));

        assert!(perms.has_permission(user, "purchase.payment-order", "approve"));
        assert!(perms.has_permission(user, "anything", "at-all"));
    }
}
