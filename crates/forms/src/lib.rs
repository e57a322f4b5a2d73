//! `ledgerpay-forms` — the shared approval/cancellation envelope.
//!
//! Every workflow-bearing document (payment order, purchase invoice, down
//! payment, return) carries exactly one active [`Form`]. The form holds two
//! independent sub-state-machines (creation approval and cancellation), the
//! externally visible document number, and the `done` settlement flag.

pub mod activity;
pub mod form;
pub mod number;

pub use activity::UserActivity;
pub use form::{Applied, ApprovalStatus, CancellationStatus, Form, FormId, FormableType};
pub use number::{format_number, increment_group};
