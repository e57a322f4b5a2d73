//! Settlement orchestration: permission checks, hydration, validation,
//! numbering, atomic claims and side effects, in that order.
//!
//! Every mutation runs inside one store transaction. Availability is
//! resolved against the claims visible in that transaction, so two racing
//! settlements against the same reference serialize on the store lock and
//! the loser sees the winner's claim.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use ledgerpay_auth::{Permission, PermissionDirectory, UserDirectory};
use ledgerpay_core::{
    Amount, ChartOfAccountId, DocumentId, DomainError, DomainResult, PaymentOrderId, SupplierId,
    TenantId, UserId,
};
use ledgerpay_forms::{Applied, Form, FormableType, UserActivity, format_number, increment_group};
use ledgerpay_payables::{
    ActiveClaim, FormCarryOver, JournalSettings, LineAllocation, OtherAllocation, PaymentOrder,
    PaymentOrderLine, ReferenceAllocationRequest, ReferenceDocument, ReferenceKind,
    SettlementRequest, check_balance, require_settlement_accounts, resolve_availability,
    update_activity_label, validate_notes, validate_settlement_amounts,
};

use crate::notifier::{NotificationRequest, Notifier, RepeatPolicy};
use crate::query::{FindAllQuery, Page, PaymentOrderView, find_all};
use crate::store::{InMemoryStore, TenantState};

/// Permission module all settlement actions live under.
const MODULE: &str = "purchase.payment-order";

/// How often and how long approvers are reminded.
const APPROVAL_REMINDER_LIMIT: u32 = 7;

/// A reference document a new settlement could still claim against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableReference {
    pub document: ReferenceDocument,
    pub remaining: Amount,
}

/// The application service for payment-order settlements.
pub struct SettlementService {
    store: Arc<InMemoryStore>,
    permissions: Arc<dyn PermissionDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl SettlementService {
    pub fn new(
        store: Arc<InMemoryStore>,
        permissions: Arc<dyn PermissionDirectory>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            permissions,
            users,
            notifier,
        }
    }

    /// Create a settlement: validate, number, claim and persist, then
    /// notify the requested approver.
    pub fn create(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        request: SettlementRequest,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "create")?;
        self.ensure_default_branch(actor)?;
        validate_notes(request.notes.as_deref())?;

        let view = self.store.transaction(tenant_id, |state| {
            let assembled = assemble(state, tenant_id, actor, &request, None)?;
            commit_assembled(state, tenant_id, actor, assembled, "Created")
        })?;

        tracing::info!(
            number = %view.form.display_number(),
            amount = view.order.amount,
            "payment order created"
        );
        self.notify_approval(tenant_id, &view);
        Ok(view)
    }

    /// Edit a settlement by supersession: archive the old form, release
    /// its settlement flags, and re-run the whole create path carrying the
    /// original number.
    pub fn update(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
        request: SettlementRequest,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "update")?;
        self.ensure_default_branch(actor)?;
        validate_notes(request.notes.as_deref())?;

        let view = self.store.transaction(tenant_id, |state| {
            let old_order = state
                .orders
                .get(&order_id)
                .cloned()
                .ok_or_else(|| DomainError::not_found(format!("payment order {order_id}")))?;
            if let Some(payment_number) = state.downstream_payments.get(&order_id) {
                return Err(DomainError::AlreadyReferenced(payment_number.clone()));
            }

            let Some(old_form) = state.active_form_mut(Uuid::from(order_id)) else {
                return Err(DomainError::conflict(format!(
                    "payment order {order_id} was already superseded"
                )));
            };
            // from_form only fails on an archived form, which the active
            // lookup above excludes.
            let Some(carry) = FormCarryOver::from_form(old_form) else {
                return Err(DomainError::conflict(format!(
                    "payment order {order_id} was already superseded"
                )));
            };
            old_form.archive_as_revision();

            // The old revision's claims vanish with its form; give back the
            // settlement flags it had set before re-resolving availability.
            for document_id in old_order.fully_claimed_references() {
                if let Some(form) = state.active_form_mut(Uuid::from(document_id)) {
                    form.done = false;
                }
            }

            let prior_updates = state.revision_count(&carry.number) as u32;
            let assembled = assemble(state, tenant_id, actor, &request, Some(carry))?;
            commit_assembled(
                state,
                tenant_id,
                actor,
                assembled,
                update_activity_label(prior_updates.saturating_sub(1)),
            )
        })?;

        tracing::info!(
            number = %view.form.display_number(),
            amount = view.order.amount,
            "payment order updated"
        );
        self.notify_approval(tenant_id, &view);
        Ok(view)
    }

    /// Approve the creation of a settlement.
    pub fn approve(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "approve")?;
        self.store.transaction(tenant_id, |state| {
            let now = Utc::now();
            let form = active_form_of_order(state, order_id)?;
            form.approve(actor, now)?;
            let number = form.display_number().to_string();
            push_activity(state, tenant_id, order_id, &number, actor, "Approved");
            view_of(state, order_id)
        })
    }

    /// Reject the creation of a settlement. Re-rejecting is a no-op and
    /// leaves no extra activity entry.
    pub fn reject(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
        reason: &str,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "approve")?;
        self.store.transaction(tenant_id, |state| {
            let now = Utc::now();
            let form = active_form_of_order(state, order_id)?;
            let applied = form.reject(actor, reason, now)?;
            let number = form.display_number().to_string();
            if applied == Applied::Changed {
                push_activity(state, tenant_id, order_id, &number, actor, "Rejected");
            }
            view_of(state, order_id)
        })
    }

    /// Request cancellation of a settlement (the delete operation). The
    /// decision goes to the same user who was asked to approve creation.
    pub fn request_cancellation(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
        reason: &str,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "delete")?;
        let view = self.store.transaction(tenant_id, |state| {
            if let Some(payment_number) = state.downstream_payments.get(&order_id) {
                return Err(DomainError::AlreadyReferenced(payment_number.clone()));
            }
            let form = active_form_of_order(state, order_id)?;
            let approver = form.request_approval_to;
            form.request_cancellation(actor, approver, reason)?;
            let number = form.display_number().to_string();
            push_activity(
                state,
                tenant_id,
                order_id,
                &number,
                actor,
                "Cancellation Requested",
            );
            view_of(state, order_id)
        })?;

        self.notify_cancellation(tenant_id, &view);
        Ok(view)
    }

    /// Approve a pending cancellation and release the settlement flags the
    /// order had set on its fully-claimed references.
    pub fn approve_cancellation(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "approve")?;
        self.store.transaction(tenant_id, |state| {
            let now = Utc::now();
            let order = state
                .orders
                .get(&order_id)
                .cloned()
                .ok_or_else(|| DomainError::not_found(format!("payment order {order_id}")))?;
            let form = active_form_of_order(state, order_id)?;
            form.approve_cancellation(actor, now)?;
            let number = form.display_number().to_string();

            for document_id in order.fully_claimed_references() {
                if let Some(reference_form) = state.active_form_mut(Uuid::from(document_id)) {
                    reference_form.done = false;
                }
            }

            push_activity(state, tenant_id, order_id, &number, actor, "Cancelled");
            view_of(state, order_id)
        })
    }

    /// Reject a pending cancellation. No reference side effects.
    pub fn reject_cancellation(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
        reason: &str,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "approve")?;
        self.store.transaction(tenant_id, |state| {
            let now = Utc::now();
            let form = active_form_of_order(state, order_id)?;
            let applied = form.reject_cancellation(actor, reason, now)?;
            let number = form.display_number().to_string();
            if applied == Applied::Changed {
                push_activity(
                    state,
                    tenant_id,
                    order_id,
                    &number,
                    actor,
                    "Cancellation Rejected",
                );
            }
            view_of(state, order_id)
        })
    }

    pub fn get(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        order_id: PaymentOrderId,
    ) -> DomainResult<PaymentOrderView> {
        self.ensure_permission(actor, "read")?;
        self.store.read(tenant_id, |state| view_of(state, order_id))?
    }

    pub fn find_all(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        query: &FindAllQuery,
    ) -> DomainResult<Page<PaymentOrderView>> {
        self.ensure_permission(actor, "read")?;
        self.store.read(tenant_id, |state| find_all(state, query))?
    }

    /// Reference documents of a supplier that a new settlement could still
    /// claim: approved, not settled, and with remaining amount above zero.
    pub fn references(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        supplier_id: SupplierId,
    ) -> DomainResult<Vec<AvailableReference>> {
        self.ensure_permission(actor, "read")?;
        self.store.read(tenant_id, |state| {
            let mut out = Vec::new();
            for reference in state.references.values() {
                if reference.supplier_id != supplier_id {
                    continue;
                }
                let Some(form) = state.active_form(Uuid::from(reference.id)) else {
                    continue;
                };
                if !form.is_approved() || form.done || form.is_cancelled() {
                    continue;
                }
                let claimed: Amount = state
                    .claims_against(reference.id)
                    .iter()
                    .filter(|c| !c.cancellation_approved)
                    .map(|c| c.amount)
                    .sum();
                let remaining = reference.total_amount - claimed;
                if remaining > 0 {
                    out.push(AvailableReference {
                        document: reference.clone(),
                        remaining,
                    });
                }
            }
            out.sort_by(|a, b| a.document.number.cmp(&b.document.number));
            out
        })
    }

    fn ensure_permission(&self, actor: UserId, action: &str) -> DomainResult<()> {
        if !self.permissions.has_permission(actor, MODULE, action) {
            return Err(DomainError::forbidden(format!(
                "missing permission {}",
                Permission::of(MODULE, action)
            )));
        }
        Ok(())
    }

    fn ensure_default_branch(&self, actor: UserId) -> DomainResult<()> {
        self.users
            .default_branch_of(actor)
            .map(|_| ())
            .ok_or_else(|| DomainError::forbidden("user has no default branch"))
    }

    fn notify_approval(&self, tenant_id: TenantId, view: &PaymentOrderView) {
        let number = view.form.display_number().to_string();
        self.notifier.enqueue(NotificationRequest {
            tenant_id,
            form_number: number.clone(),
            approver: view.form.request_approval_to,
            message: format!("{number} needs your approval"),
            repeat: Some(RepeatPolicy::daily(APPROVAL_REMINDER_LIMIT)),
        });
    }

    fn notify_cancellation(&self, tenant_id: TenantId, view: &PaymentOrderView) {
        let number = view.form.display_number().to_string();
        let Some(approver) = view.form.request_cancellation_to else {
            return;
        };
        self.notifier.enqueue(NotificationRequest {
            tenant_id,
            form_number: number.clone(),
            approver,
            message: format!("cancellation of {number} needs your approval"),
            repeat: Some(RepeatPolicy::daily(APPROVAL_REMINDER_LIMIT)),
        });
    }
}

struct AssembledSettlement {
    order: PaymentOrder,
    form: Form,
    exhausted: Vec<DocumentId>,
}

/// Journal-settings view over a tenant snapshot.
struct SettingsView<'a>(&'a HashMap<(String, String), ChartOfAccountId>);

impl JournalSettings for SettingsView<'_> {
    fn account(&self, feature: &str, name: &str) -> Option<ChartOfAccountId> {
        self.0
            .get(&(feature.to_string(), name.to_string()))
            .copied()
    }
}

/// Validate a request against current tenant state and build the new order
/// and form. Called with the store lock held; claims read here cannot
/// change before the caller commits.
fn assemble(
    state: &mut TenantState,
    tenant_id: TenantId,
    actor: UserId,
    request: &SettlementRequest,
    carry: Option<FormCarryOver>,
) -> DomainResult<AssembledSettlement> {
    let supplier = state
        .suppliers
        .get(&request.supplier_id)
        .cloned()
        .ok_or_else(|| DomainError::not_found(format!("supplier {}", request.supplier_id)))?;

    let mut others = Vec::with_capacity(request.others.len());
    for line in &request.others {
        let account = state
            .chart_of_accounts
            .get(&line.chart_of_account_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!("chart of account {}", line.chart_of_account_id))
            })?;
        others.push(OtherAllocation {
            account,
            amount: line.amount,
            notes: line.notes.clone(),
        });
    }

    let totals = validate_settlement_amounts(request, &others)?;
    require_settlement_accounts(&SettingsView(&state.journal_settings))?;

    let invoice_amounts: Vec<Amount> = request.invoices.iter().map(|l| l.amount).collect();
    let down_payment_amounts: Vec<Amount> =
        request.down_payments.iter().map(|l| l.amount).collect();
    let return_amounts: Vec<Amount> = request.returns.iter().map(|l| l.amount).collect();
    check_balance(
        totals.amount,
        &invoice_amounts,
        &down_payment_amounts,
        &return_amounts,
        &others,
    )?
    .into_result()?;

    let (number, increment_number, group) = match carry {
        Some(carry) => (carry.number, carry.increment_number, carry.increment_group),
        None => {
            let group = increment_group(request.date);
            let increment = state.next_increment(FormableType::PaymentOrder, group);
            let number = format_number(FormableType::PaymentOrder.number_prefix(), request.date, increment);
            state.ensure_number_free(&number)?;
            (number, increment, group)
        }
    };

    let mut lines = Vec::new();
    let mut exhausted = Vec::new();
    // Amounts already allocated to a document by earlier lines of this
    // same request.
    let mut in_flight: HashMap<DocumentId, Amount> = HashMap::new();

    let groups: [(ReferenceKind, &[ReferenceAllocationRequest]); 3] = [
        (ReferenceKind::PurchaseInvoice, &request.invoices),
        (ReferenceKind::PurchaseDownPayment, &request.down_payments),
        (ReferenceKind::PurchaseReturn, &request.returns),
    ];
    for (expected_kind, allocations) in groups {
        for allocation in allocations {
            let reference = state
                .references
                .get(&allocation.document_id)
                .cloned()
                .ok_or_else(|| {
                    DomainError::not_found(format!(
                        "reference document {}",
                        allocation.document_id
                    ))
                })?;
            if reference.kind != expected_kind {
                return Err(DomainError::invalid_data(format!(
                    "{} is a {}, expected a {}",
                    reference.number,
                    reference.kind.label(),
                    expected_kind.label()
                )));
            }

            let mut claims = state.claims_against(reference.id);
            if let Some(extra) = in_flight.get(&reference.id) {
                claims.push(ActiveClaim {
                    form_number: number.clone(),
                    amount: *extra,
                    cancellation_approved: false,
                });
            }

            let availability =
                resolve_availability(&reference, &claims, allocation.amount, request.supplier_id)?;
            if availability.fully_claimed {
                exhausted.push(reference.id);
            }
            *in_flight.entry(reference.id).or_insert(0) += allocation.amount;

            lines.push(PaymentOrderLine {
                allocation: LineAllocation::Reference {
                    kind: reference.kind,
                    document_id: reference.id,
                    number: reference.number.clone(),
                    available: availability.available,
                },
                amount: allocation.amount,
            });
        }
    }

    for other in others {
        let amount = other.amount;
        lines.push(PaymentOrderLine {
            allocation: LineAllocation::Other {
                account: other.account,
                notes: other.notes,
            },
            amount,
        });
    }

    let order = PaymentOrder {
        id: PaymentOrderId::new(),
        tenant_id,
        supplier_id: supplier.id,
        supplier_name: supplier.name,
        payment_type: request.payment_type,
        amount: totals.amount,
        lines,
    };
    let form = Form::pending(
        tenant_id,
        FormableType::PaymentOrder,
        Uuid::from(order.id),
        number,
        increment_number,
        group,
        request.date,
        request.notes.clone(),
        actor,
        request.request_approval_to,
    );

    Ok(AssembledSettlement {
        order,
        form,
        exhausted,
    })
}

/// Persist an assembled settlement: mark exhausted references settled,
/// insert the rows, write the audit entry.
fn commit_assembled(
    state: &mut TenantState,
    tenant_id: TenantId,
    actor: UserId,
    assembled: AssembledSettlement,
    activity: impl Into<String>,
) -> DomainResult<PaymentOrderView> {
    let AssembledSettlement {
        order,
        form,
        exhausted,
    } = assembled;

    for document_id in exhausted {
        if let Some(reference_form) = state.active_form_mut(Uuid::from(document_id)) {
            reference_form.done = true;
        }
    }

    let number = form.display_number().to_string();
    let order_id = order.id;
    state.activities.push(UserActivity::new(
        tenant_id,
        FormableType::PaymentOrder.table_type(),
        Uuid::from(order_id),
        &number,
        actor,
        activity,
        Utc::now(),
    ));

    let view = PaymentOrderView {
        order: order.clone(),
        form: form.clone(),
    };
    state.orders.insert(order.id, order);
    state.forms.insert(form.id, form);
    Ok(view)
}

fn push_activity(
    state: &mut TenantState,
    tenant_id: TenantId,
    order_id: PaymentOrderId,
    number: &str,
    actor: UserId,
    activity: &str,
) {
    state.activities.push(UserActivity::new(
        tenant_id,
        FormableType::PaymentOrder.table_type(),
        Uuid::from(order_id),
        number,
        actor,
        activity,
        Utc::now(),
    ));
}

fn active_form_of_order(
    state: &mut TenantState,
    order_id: PaymentOrderId,
) -> DomainResult<&mut Form> {
    if !state.orders.contains_key(&order_id) {
        return Err(DomainError::not_found(format!("payment order {order_id}")));
    }
    state
        .active_form_mut(Uuid::from(order_id))
        .ok_or_else(|| {
            DomainError::conflict(format!("payment order {order_id} was already superseded"))
        })
}

fn view_of(state: &TenantState, order_id: PaymentOrderId) -> DomainResult<PaymentOrderView> {
    let order = state
        .orders
        .get(&order_id)
        .cloned()
        .ok_or_else(|| DomainError::not_found(format!("payment order {order_id}")))?;
    let form = state
        .display_form(Uuid::from(order_id))
        .cloned()
        .ok_or_else(|| DomainError::not_found(format!("payment order {order_id}")))?;
    Ok(PaymentOrderView { order, form })
}
