//! Domain error model.
//!
//! Error messages are part of the caller-visible contract: every
//! business-rule failure interpolates the concrete expected/received values
//! or document number, and the test suite asserts on the rendered strings.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced resource (supplier, reference document, approver) is missing.
    #[error("{0} not found")]
    NotFound(String),

    /// Permission / wrong-approver / wrong-branch failure.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A value failed validation (e.g. malformed input, notes too long).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A declared total disagrees with the sum of its lines (or the net amount).
    #[error("incorrect {field}, expected {expected} received {received}")]
    AmountMismatch {
        field: &'static str,
        expected: i64,
        received: i64,
    },

    /// Down payment or return subtotal exceeds the invoice subtotal.
    #[error("total {kind} amount {amount} exceeds total invoice amount {invoice_amount}")]
    ExceedsInvoice {
        kind: &'static str,
        amount: i64,
        invoice_amount: i64,
    },

    /// A claim asks for more than the reference document still has available.
    #[error("insufficient available amount on {number}, available {available} requested {requested}")]
    InsufficientAvailable {
        number: String,
        available: i64,
        requested: i64,
    },

    /// A reference document belongs to a different supplier than the settlement.
    #[error("supplier mismatch on {number}, expected {expected} found {received}")]
    InvalidSupplier {
        number: String,
        expected: String,
        received: String,
    },

    /// Double-entry totals disagree for the proposed settlement.
    #[error("journal not balanced, debit {debit} credit {credit}")]
    JournalImbalance { debit: i64, credit: i64 },

    /// The payment order is already claimed by a downstream document.
    #[error("payment order already referenced by {0}")]
    AlreadyReferenced(String),

    /// Approval was requested on a form that is already approved.
    #[error("form already approved")]
    AlreadyApproved,

    /// Approval was requested on a form that is already rejected.
    #[error("form already rejected")]
    AlreadyRejected,

    /// A cancellation decision was requested while no cancellation is pending.
    #[error("cancellation is not pending")]
    NotPendingCancellation,

    /// Tenant setup gap: a required journal setting is absent.
    #[error("setting journal {feature} - {name} is missing")]
    ConfigurationMissing { feature: String, name: String },

    /// Storage-level conflict (duplicate form number, lost concurrent race).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn configuration_missing(feature: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            feature: feature.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_messages_carry_concrete_values() {
        let err = DomainError::AmountMismatch {
            field: "total invoice amount",
            expected: 100_000,
            received: 90_000,
        };
        assert_eq!(
            err.to_string(),
            "incorrect total invoice amount, expected 100000 received 90000"
        );

        let err = DomainError::InsufficientAvailable {
            number: "PI2101001".to_string(),
            available: 40,
            requested: 60,
        };
        assert_eq!(
            err.to_string(),
            "insufficient available amount on PI2101001, available 40 requested 60"
        );

        let err = DomainError::configuration_missing("purchase", "account payable");
        assert_eq!(
            err.to_string(),
            "setting journal purchase - account payable is missing"
        );
    }
}
