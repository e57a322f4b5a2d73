//! Tenant-scoped storage for the settlement workflow.
//!
//! Only the in-memory backend ships here; a SQL backend would keep the
//! same shape, with [`InMemoryStore::transaction`] mapping to a database
//! transaction plus a `SELECT ... FOR UPDATE` on the touched references.

mod memory;

use serde::{Deserialize, Serialize};

use ledgerpay_core::SupplierId;

pub use memory::{InMemoryStore, TenantState};

/// Supplier projection consumed by the settlement workflow (owned by the
/// parties module, read-only here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
}
