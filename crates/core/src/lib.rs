//! `ledgerpay-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{
    BranchId, ChartOfAccountId, DocumentId, PaymentOrderId, SupplierId, TenantId, UserId,
};

/// Monetary amount in the smallest currency unit (e.g. cents).
///
/// All balance checks are exact integer equality; amounts entering the
/// system are already rounded currency values.
pub type Amount = i64;
