use serde::{Deserialize, Serialize};

use ledgerpay_core::{Amount, DocumentId, SupplierId};
use ledgerpay_forms::FormableType;

/// Kind of document a payment order may settle.
///
/// Polymorphic `referenceable_id/type` pairs from the storage layer are
/// represented as this tag plus a [`DocumentId`], resolved eagerly before
/// any decision logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    PurchaseInvoice,
    PurchaseDownPayment,
    PurchaseReturn,
}

impl ReferenceKind {
    pub fn formable_type(&self) -> FormableType {
        match self {
            ReferenceKind::PurchaseInvoice => FormableType::PurchaseInvoice,
            ReferenceKind::PurchaseDownPayment => FormableType::PurchaseDownPayment,
            ReferenceKind::PurchaseReturn => FormableType::PurchaseReturn,
        }
    }

    /// Human label used in error messages and activity entries.
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::PurchaseInvoice => "purchase invoice",
            ReferenceKind::PurchaseDownPayment => "purchase down payment",
            ReferenceKind::PurchaseReturn => "purchase return",
        }
    }
}

/// Immutable financial fact a settlement claims against.
///
/// Created by its own workflow (out of scope); consumed here read-only.
/// The mutable `done` flag lives on the document's form, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub id: DocumentId,
    pub kind: ReferenceKind,
    /// External document number, e.g. "PI2101001".
    pub number: String,
    pub supplier_id: SupplierId,
    pub total_amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_formable_type_and_label() {
        assert_eq!(
            ReferenceKind::PurchaseInvoice.formable_type(),
            FormableType::PurchaseInvoice
        );
        assert_eq!(ReferenceKind::PurchaseDownPayment.label(), "purchase down payment");
    }
}
