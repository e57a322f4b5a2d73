//! `ledgerpay-payables` — payment-order settlement domain.
//!
//! Pure decision logic only: reference availability, journal balance,
//! settlement validation and the payment-order aggregate. Everything here
//! operates on fully-hydrated values passed in by the caller; storage,
//! locking and notification live in `ledgerpay-infra`.

pub mod availability;
pub mod journal;
pub mod order;
pub mod reference;
pub mod revision;

pub use availability::{ActiveClaim, Availability, resolve_availability};
pub use journal::{
    BalanceReport, ChartOfAccount, JournalSettings, SettlementAccounts, check_balance,
    require_settlement_accounts,
};
pub use order::{
    LineAllocation, OtherAllocation, OtherAllocationRequest, PaymentOrder, PaymentOrderLine,
    PaymentType, ReferenceAllocationRequest, SettlementRequest, SettlementTotals, validate_notes,
    validate_settlement_amounts,
};
pub use reference::{ReferenceDocument, ReferenceKind};
pub use revision::{FormCarryOver, update_activity_label};
