//! Reference availability resolution.
//!
//! For a reference document, the available amount is its total minus the
//! sum of all lines from non-cancelled payment orders claiming it. Pending
//! and rejected cancellations still hold their claim; only an approved
//! cancellation releases it.
//!
//! This module is read-only decision logic. The storage layer must run it
//! again inside its atomic claim path (holding the write lock) so that the
//! check and the line insert form one critical section — see
//! `ledgerpay_infra::store`.

use serde::{Deserialize, Serialize};

use ledgerpay_core::{Amount, DomainError, DomainResult, SupplierId};

use crate::reference::ReferenceDocument;

/// One existing payment-order line against a reference, hydrated with the
/// owning form's identity and cancellation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveClaim {
    /// Display number of the owning payment order's form.
    pub form_number: String,
    pub amount: Amount,
    /// True when the owning form's cancellation was approved.
    pub cancellation_approved: bool,
}

/// Resolver output: the remaining amount before the new claim, and whether
/// the new claim exhausts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    /// Snapshot to store on the new line: availability *before* this claim.
    pub available: Amount,
    /// The claim consumes the reference exactly; caller marks it done.
    pub fully_claimed: bool,
}

/// Compute availability and validate a claim against it.
///
/// A revision never collides with its own previous lines: the old form is
/// archived before the replacement re-resolves, so those claims are not in
/// `claims` to begin with.
pub fn resolve_availability(
    reference: &ReferenceDocument,
    claims: &[ActiveClaim],
    requested: Amount,
    expected_supplier: SupplierId,
) -> DomainResult<Availability> {
    if reference.supplier_id != expected_supplier {
        return Err(DomainError::InvalidSupplier {
            number: reference.number.clone(),
            expected: expected_supplier.to_string(),
            received: reference.supplier_id.to_string(),
        });
    }

    let mut claimed: Amount = 0;
    for claim in claims.iter().filter(|c| !c.cancellation_approved) {
        claimed = claimed
            .checked_add(claim.amount)
            .ok_or_else(|| DomainError::invalid_data("claimed amounts overflow"))?;
    }

    let available = reference
        .total_amount
        .checked_sub(claimed)
        .ok_or_else(|| DomainError::invalid_data("claimed amounts overflow"))?;
    if requested > available {
        return Err(DomainError::InsufficientAvailable {
            number: reference.number.clone(),
            available,
            requested,
        });
    }

    Ok(Availability {
        available,
        fully_claimed: available == requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceKind;
    use ledgerpay_core::DocumentId;
    use proptest::prelude::*;

    fn invoice(total: Amount, supplier: SupplierId) -> ReferenceDocument {
        ReferenceDocument {
            id: DocumentId::new(),
            kind: ReferenceKind::PurchaseInvoice,
            number: "PI2101001".to_string(),
            supplier_id: supplier,
            total_amount: total,
        }
    }

    fn claim(number: &str, amount: Amount) -> ActiveClaim {
        ActiveClaim {
            form_number: number.to_string(),
            amount,
            cancellation_approved: false,
        }
    }

    #[test]
    fn unclaimed_reference_is_fully_available() {
        let supplier = SupplierId::new();
        let availability =
            resolve_availability(&invoice(100_000, supplier), &[], 60_000, supplier).unwrap();
        assert_eq!(availability.available, 100_000);
        assert!(!availability.fully_claimed);
    }

    #[test]
    fn active_claims_reduce_availability() {
        let supplier = SupplierId::new();
        let claims = vec![claim("PP2101001", 30_000), claim("PP2101002", 20_000)];
        let availability =
            resolve_availability(&invoice(100_000, supplier), &claims, 50_000, supplier).unwrap();
        assert_eq!(availability.available, 50_000);
        assert!(availability.fully_claimed);
    }

    #[test]
    fn approved_cancellation_releases_its_claim() {
        let supplier = SupplierId::new();
        let claims = vec![
            ActiveClaim {
                form_number: "PP2101001".to_string(),
                amount: 70_000,
                cancellation_approved: true,
            },
            claim("PP2101002", 10_000),
        ];
        let availability =
            resolve_availability(&invoice(100_000, supplier), &claims, 90_000, supplier).unwrap();
        assert_eq!(availability.available, 90_000);
        assert!(availability.fully_claimed);
    }

    #[test]
    fn pending_cancellation_still_holds_the_claim() {
        let supplier = SupplierId::new();
        // Pending/rejected cancellations arrive with cancellation_approved=false.
        let claims = vec![claim("PP2101001", 70_000)];
        let err = resolve_availability(&invoice(100_000, supplier), &claims, 40_000, supplier)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "insufficient available amount on PI2101001, available 30000 requested 40000"
        );
    }

    #[test]
    fn overflowing_claims_are_invalid_data() {
        let supplier = SupplierId::new();
        let claims = vec![claim("PP2101001", Amount::MAX), claim("PP2101002", Amount::MAX)];
        let err = resolve_availability(&invoice(100_000, supplier), &claims, 1, supplier)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid data: claimed amounts overflow");
    }

    #[test]
    fn wrong_supplier_is_rejected() {
        let supplier = SupplierId::new();
        let other = SupplierId::new();
        let err =
            resolve_availability(&invoice(100_000, supplier), &[], 10_000, other).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSupplier { .. }));
        assert!(err.to_string().starts_with("supplier mismatch on PI2101001"));
    }

    proptest! {
        /// Availability never goes negative: any claim that would make it
        /// negative is rejected before persisting.
        #[test]
        fn availability_never_negative(
            total in 1i64..1_000_000,
            amounts in prop::collection::vec(1i64..1_000_000, 0..8),
            requested in 1i64..1_000_000,
        ) {
            let supplier = SupplierId::new();
            let reference = invoice(total, supplier);
            let claims: Vec<ActiveClaim> = amounts
                .iter()
                .enumerate()
                .map(|(i, a)| claim(&format!("PP21010{i:02}"), *a))
                .collect();

            match resolve_availability(&reference, &claims, requested, supplier) {
                Ok(availability) => {
                    prop_assert!(availability.available >= requested);
                    prop_assert!(availability.available - requested >= 0);
                }
                Err(DomainError::InsufficientAvailable { available, requested: r, .. }) => {
                    prop_assert!(r > available);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
