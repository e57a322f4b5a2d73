use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerpay_core::{
    Amount, ChartOfAccountId, DocumentId, DomainError, DomainResult, PaymentOrderId, SupplierId,
    TenantId, UserId,
};

use crate::journal::ChartOfAccount;
use crate::reference::ReferenceKind;

/// How the settlement is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Transfer,
}

/// One requested allocation against a reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceAllocationRequest {
    pub document_id: DocumentId,
    pub amount: Amount,
}

/// One requested direct chart-of-account adjustment ("other" line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAllocationRequest {
    pub chart_of_account_id: ChartOfAccountId,
    pub amount: Amount,
    pub notes: Option<String>,
}

/// Hydrated "other" adjustment: the account's debit/credit nature decides
/// which journal side the amount lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAllocation {
    pub account: ChartOfAccount,
    pub amount: Amount,
    pub notes: Option<String>,
}

/// Client settlement request. Subtotals and the grand total are declared by
/// the client and re-derived server-side as a defense-in-depth double
/// check; any disagreement is an `AmountMismatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub supplier_id: SupplierId,
    pub payment_type: PaymentType,
    pub date: DateTime<Utc>,
    pub invoices: Vec<ReferenceAllocationRequest>,
    pub down_payments: Vec<ReferenceAllocationRequest>,
    pub returns: Vec<ReferenceAllocationRequest>,
    pub others: Vec<OtherAllocationRequest>,
    pub total_invoice_amount: Amount,
    pub total_down_payment_amount: Amount,
    pub total_return_amount: Amount,
    /// Declared net of the "other" lines (debit minus credit).
    pub total_other_amount: Amount,
    pub total_amount: Amount,
    pub notes: Option<String>,
    pub request_approval_to: UserId,
}

/// Server-derived settlement figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementTotals {
    pub invoice: Amount,
    pub down_payment: Amount,
    pub returns: Amount,
    /// Net of "other" lines: sum of debit-natured minus sum of credit-natured.
    pub other_net: Amount,
    /// Net settlement total: invoice − down payment − returns + other net.
    pub amount: Amount,
}

/// Notes are optional, at most 255 chars, and must not carry leading or
/// trailing whitespace.
pub fn validate_notes(notes: Option<&str>) -> DomainResult<()> {
    let Some(notes) = notes else {
        return Ok(());
    };
    if notes.chars().count() > 255 {
        return Err(DomainError::invalid_data(
            "notes must be at most 255 characters",
        ));
    }
    if notes != notes.trim() {
        return Err(DomainError::invalid_data(
            "notes must not have leading or trailing spaces",
        ));
    }
    Ok(())
}

/// Validate the declared subtotals and derive the settlement totals.
///
/// The request must carry at least one line, every line amount must be
/// positive, and all sums use checked arithmetic so hostile totals surface
/// as `InvalidData` instead of wrapping.
///
/// `others` must be the hydrated counterparts of `request.others`, in order.
pub fn validate_settlement_amounts(
    request: &SettlementRequest,
    others: &[OtherAllocation],
) -> DomainResult<SettlementTotals> {
    if request.invoices.is_empty()
        && request.down_payments.is_empty()
        && request.returns.is_empty()
        && others.is_empty()
    {
        return Err(DomainError::invalid_data(
            "settlement must have at least one line",
        ));
    }

    let invoice = checked_subtotal(
        "invoice",
        "total invoice amount",
        &request.invoices,
        request.total_invoice_amount,
    )?;
    let down_payment = checked_subtotal(
        "down payment",
        "total down payment amount",
        &request.down_payments,
        request.total_down_payment_amount,
    )?;
    let returns = checked_subtotal(
        "return",
        "total return amount",
        &request.returns,
        request.total_return_amount,
    )?;

    let mut other_net: Amount = 0;
    for other in others {
        if other.amount <= 0 {
            return Err(DomainError::invalid_data(
                "other line amount must be positive",
            ));
        }
        other_net = if other.account.is_debit {
            other_net.checked_add(other.amount)
        } else {
            other_net.checked_sub(other.amount)
        }
        .ok_or_else(|| DomainError::invalid_data("total other amount overflows"))?;
    }
    if other_net != request.total_other_amount {
        return Err(DomainError::AmountMismatch {
            field: "total other amount",
            expected: other_net,
            received: request.total_other_amount,
        });
    }

    if down_payment > invoice {
        return Err(DomainError::ExceedsInvoice {
            kind: "down payment",
            amount: down_payment,
            invoice_amount: invoice,
        });
    }
    if returns > invoice {
        return Err(DomainError::ExceedsInvoice {
            kind: "return",
            amount: returns,
            invoice_amount: invoice,
        });
    }

    let amount = invoice
        .checked_sub(down_payment)
        .and_then(|a| a.checked_sub(returns))
        .and_then(|a| a.checked_add(other_net))
        .ok_or_else(|| DomainError::invalid_data("total amount overflows"))?;
    if amount != request.total_amount {
        return Err(DomainError::AmountMismatch {
            field: "total amount",
            expected: amount,
            received: request.total_amount,
        });
    }

    Ok(SettlementTotals {
        invoice,
        down_payment,
        returns,
        other_net,
        amount,
    })
}

fn checked_subtotal(
    group: &'static str,
    field: &'static str,
    lines: &[ReferenceAllocationRequest],
    declared: Amount,
) -> DomainResult<Amount> {
    let mut sum: Amount = 0;
    for line in lines {
        if line.amount <= 0 {
            return Err(DomainError::invalid_data(format!(
                "{group} line amount must be positive"
            )));
        }
        sum = sum
            .checked_add(line.amount)
            .ok_or_else(|| DomainError::invalid_data(format!("{field} overflows")))?;
    }
    if sum != declared {
        return Err(DomainError::AmountMismatch {
            field,
            expected: sum,
            received: declared,
        });
    }
    Ok(sum)
}

/// Where a payment-order line allocates its amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LineAllocation {
    /// Claim against a reference document. `available` snapshots the
    /// reference's remaining amount *before* this claim (immutable).
    Reference {
        kind: ReferenceKind,
        document_id: DocumentId,
        number: String,
        available: Amount,
    },
    /// Direct ledger adjustment.
    Other {
        account: ChartOfAccount,
        notes: Option<String>,
    },
}

/// One allocation owned by a payment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrderLine {
    pub allocation: LineAllocation,
    pub amount: Amount,
}

impl PaymentOrderLine {
    /// True when this line claimed the reference's entire availability.
    pub fn fully_claims_reference(&self) -> bool {
        matches!(
            &self.allocation,
            LineAllocation::Reference { available, .. } if *available == self.amount
        )
    }
}

/// Aggregate record of one settlement. Created once per request and
/// superseded (never mutated) on edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: PaymentOrderId,
    pub tenant_id: TenantId,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub payment_type: PaymentType,
    /// Net settlement total (validated against the declared total).
    pub amount: Amount,
    pub lines: Vec<PaymentOrderLine>,
}

impl PaymentOrder {
    pub fn reference_lines(&self) -> impl Iterator<Item = (&ReferenceKind, DocumentId, Amount)> {
        self.lines.iter().filter_map(|l| match &l.allocation {
            LineAllocation::Reference {
                kind, document_id, ..
            } => Some((kind, *document_id, l.amount)),
            LineAllocation::Other { .. } => None,
        })
    }

    /// References this order claimed to zero. These are exactly the `done`
    /// flags released again when the order's cancellation is approved.
    pub fn fully_claimed_references(&self) -> Vec<DocumentId> {
        self.lines
            .iter()
            .filter(|l| l.fully_claims_reference())
            .filter_map(|l| match &l.allocation {
                LineAllocation::Reference { document_id, .. } => Some(*document_id),
                LineAllocation::Other { .. } => None,
            })
            .collect()
    }
}
