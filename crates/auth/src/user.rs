use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use ledgerpay_core::{BranchId, UserId};

/// Minimal user projection consumed by the settlement workflow.
///
/// A maker must have a default branch before they can create settlements;
/// approvers are addressed by id and displayed by name in activity entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub default_branch_id: Option<BranchId>,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, default_branch_id: Option<BranchId>) -> Self {
        Self {
            id,
            name: name.into(),
            default_branch_id,
        }
    }
}

/// User lookup collaborator (default-branch resolution, approver identity).
pub trait UserDirectory: Send + Sync {
    fn profile(&self, user_id: UserId) -> Option<UserProfile>;

    fn default_branch_of(&self, user_id: UserId) -> Option<BranchId> {
        self.profile(user_id).and_then(|p| p.default_branch_id)
    }
}

/// In-memory user directory (tests and single-process deployments).
#[derive(Debug, Default)]
pub struct StaticUsers {
    users: HashMap<UserId, UserProfile>,
}

impl StaticUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.id, profile);
    }
}

impl UserDirectory for StaticUsers {
    fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.users.get(&user_id).cloned()
    }
}
