//! `ledgerpay-infra` — storage, orchestration and side-effect plumbing.
//!
//! The domain crates decide; this crate loads, locks, persists and
//! notifies. The in-memory store runs every settlement mutation inside one
//! critical section, which is what closes the availability race described
//! in the settlement service.

pub mod notifier;
pub mod query;
pub mod service;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use notifier::{NotificationRequest, Notifier, RecordingNotifier, RepeatPolicy, TracingNotifier};
pub use query::{FindAllQuery, Page, PaymentOrderView, StatusFilter};
pub use service::{AvailableReference, SettlementService};
pub use store::{InMemoryStore, Supplier, TenantState};
