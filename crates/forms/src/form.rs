use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerpay_core::{DomainError, DomainResult, TenantId, UserId};

/// Unique identifier for a form row (one row per revision).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for FormId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document kind a form can be attached to. Determines the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormableType {
    PaymentOrder,
    PurchaseInvoice,
    PurchaseDownPayment,
    PurchaseReturn,
}

impl FormableType {
    pub fn number_prefix(&self) -> &'static str {
        match self {
            FormableType::PaymentOrder => "PP",
            FormableType::PurchaseInvoice => "PI",
            FormableType::PurchaseDownPayment => "PD",
            FormableType::PurchaseReturn => "PR",
        }
    }

    /// Table name used in user-activity entries.
    pub fn table_type(&self) -> &'static str {
        match self {
            FormableType::PaymentOrder => "PaymentOrder",
            FormableType::PurchaseInvoice => "PurchaseInvoice",
            FormableType::PurchaseDownPayment => "PurchaseDownPayment",
            FormableType::PurchaseReturn => "PurchaseReturn",
        }
    }
}

/// Creation-approval sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Cancellation sub-state. `None` means cancellation was never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

/// Whether a transition changed the form or was an idempotent no-op.
///
/// The no-op arms exist on the reject paths only: re-rejecting a creation
/// or a cancellation returns the current state, while re-approving an
/// approved form is a hard error. That asymmetry is intended and verified
/// by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    NoOp,
}

/// The shared approval envelope attached 1:1 to a workflow document.
///
/// A form row is append-only per revision: editing the underlying document
/// archives this row (`number` moves to `edited_number`) and appends a
/// fresh pending row carrying the same external number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    pub tenant_id: TenantId,
    pub formable_type: FormableType,
    /// Id of the owning document (payment order or reference document).
    pub formable_id: Uuid,
    /// External document number; `None` once this row is superseded.
    pub number: Option<String>,
    /// Holds the old number after supersession, for the audit trail.
    pub edited_number: Option<String>,
    pub increment_number: u32,
    pub increment_group: u32,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub request_approval_to: UserId,
    pub approval: ApprovalStatus,
    pub approval_by: Option<UserId>,
    pub approval_at: Option<DateTime<Utc>>,
    pub approval_reason: Option<String>,
    pub cancellation: CancellationStatus,
    pub request_cancellation_by: Option<UserId>,
    pub request_cancellation_to: Option<UserId>,
    pub request_cancellation_reason: Option<String>,
    pub cancellation_by: Option<UserId>,
    pub cancellation_at: Option<DateTime<Utc>>,
    /// A reference document is `done` when fully settled; a payment order
    /// never uses this flag itself.
    pub done: bool,
}

impl Form {
    /// Fresh pending form for a newly created document.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        tenant_id: TenantId,
        formable_type: FormableType,
        formable_id: Uuid,
        number: String,
        increment_number: u32,
        increment_group: u32,
        date: DateTime<Utc>,
        notes: Option<String>,
        created_by: UserId,
        request_approval_to: UserId,
    ) -> Self {
        Self {
            id: FormId::new(),
            tenant_id,
            formable_type,
            formable_id,
            number: Some(number),
            edited_number: None,
            increment_number,
            increment_group,
            date,
            notes,
            created_by,
            request_approval_to,
            approval: ApprovalStatus::Pending,
            approval_by: None,
            approval_at: None,
            approval_reason: None,
            cancellation: CancellationStatus::None,
            request_cancellation_by: None,
            request_cancellation_to: None,
            request_cancellation_reason: None,
            cancellation_by: None,
            cancellation_at: None,
            done: false,
        }
    }

    /// Number for display: the active number, or the archived one.
    pub fn display_number(&self) -> &str {
        self.number
            .as_deref()
            .or(self.edited_number.as_deref())
            .unwrap_or("")
    }

    /// A form's claims stop counting only once cancellation is approved;
    /// pending or rejected cancellations still hold the claim.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation == CancellationStatus::Approved
    }

    pub fn is_approved(&self) -> bool {
        self.approval == ApprovalStatus::Approved
    }

    /// Approve the creation of the underlying document.
    ///
    /// Gate: approval must still be pending and the actor must be the
    /// requested approver.
    pub fn approve(&mut self, actor: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        match self.approval {
            ApprovalStatus::Approved => return Err(DomainError::AlreadyApproved),
            ApprovalStatus::Rejected => return Err(DomainError::AlreadyRejected),
            ApprovalStatus::Pending => {}
        }
        self.ensure_requested_approver(actor)?;

        self.approval = ApprovalStatus::Approved;
        self.approval_by = Some(actor);
        self.approval_at = Some(at);
        Ok(())
    }

    /// Reject the creation of the underlying document.
    ///
    /// Re-rejecting an already-rejected form is a no-op; rejecting an
    /// approved form is a hard error.
    pub fn reject(
        &mut self,
        actor: UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Applied> {
        match self.approval {
            ApprovalStatus::Rejected => return Ok(Applied::NoOp),
            ApprovalStatus::Approved => return Err(DomainError::AlreadyApproved),
            ApprovalStatus::Pending => {}
        }
        self.ensure_requested_approver(actor)?;
        validate_reason(reason)?;

        self.approval = ApprovalStatus::Rejected;
        self.approval_by = Some(actor);
        self.approval_at = Some(at);
        self.approval_reason = Some(reason.trim().to_string());
        Ok(Applied::Changed)
    }

    /// Open the cancellation sub-workflow.
    ///
    /// The downstream-reference precondition (`AlreadyReferenced`) is
    /// checked by the caller, which owns the cross-document view.
    pub fn request_cancellation(
        &mut self,
        by: UserId,
        to: UserId,
        reason: &str,
    ) -> DomainResult<()> {
        validate_reason(reason)?;

        self.cancellation = CancellationStatus::Pending;
        self.request_cancellation_by = Some(by);
        self.request_cancellation_to = Some(to);
        self.request_cancellation_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Approve a pending cancellation. The caller releases the `done`
    /// flags this document's claims had set, in the same transaction.
    pub fn approve_cancellation(&mut self, actor: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        if self.cancellation != CancellationStatus::Pending {
            return Err(DomainError::NotPendingCancellation);
        }
        self.ensure_requested_canceller(actor)?;

        self.cancellation = CancellationStatus::Approved;
        self.cancellation_by = Some(actor);
        self.cancellation_at = Some(at);
        Ok(())
    }

    /// Reject a pending cancellation. No reference side effects.
    ///
    /// Re-rejecting an already-rejected cancellation is a no-op.
    pub fn reject_cancellation(
        &mut self,
        actor: UserId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Applied> {
        if self.cancellation == CancellationStatus::Rejected {
            return Ok(Applied::NoOp);
        }
        if self.cancellation != CancellationStatus::Pending {
            return Err(DomainError::NotPendingCancellation);
        }
        self.ensure_requested_canceller(actor)?;
        validate_reason(reason)?;

        self.cancellation = CancellationStatus::Rejected;
        self.cancellation_by = Some(actor);
        self.cancellation_at = Some(at);
        self.request_cancellation_reason = Some(reason.trim().to_string());
        Ok(Applied::Changed)
    }

    /// Archive this row when the underlying document is superseded.
    ///
    /// The number is immutable post-assignment: it moves to
    /// `edited_number` and the fresh revision row carries it forward.
    pub fn archive_as_revision(&mut self) {
        if let Some(number) = self.number.take() {
            self.edited_number = Some(number);
        }
    }

    fn ensure_requested_approver(&self, actor: UserId) -> DomainResult<()> {
        if self.request_approval_to != actor {
            return Err(DomainError::forbidden(format!(
                "approval of {} was requested to another user",
                self.display_number()
            )));
        }
        Ok(())
    }

    fn ensure_requested_canceller(&self, actor: UserId) -> DomainResult<()> {
        if self.request_cancellation_to != Some(actor) {
            return Err(DomainError::forbidden(format!(
                "cancellation of {} was requested to another user",
                self.display_number()
            )));
        }
        Ok(())
    }
}

/// Approval/rejection reasons are mandatory, trimmed, and at most 255 chars.
fn validate_reason(reason: &str) -> DomainResult<()> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_data("reason must not be empty"));
    }
    if trimmed.chars().count() > 255 {
        return Err(DomainError::invalid_data(
            "reason must be at most 255 characters",
        ));
    }
    Ok(())
}
