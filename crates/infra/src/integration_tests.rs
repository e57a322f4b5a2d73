//! End-to-end tests of the settlement workflow against the in-memory
//! store: create, edit, approve, cancel, list, and the concurrent
//! double-claim race.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};

use ledgerpay_auth::{StaticPermissions, StaticUsers, UserProfile};
use ledgerpay_core::{
    Amount, BranchId, ChartOfAccountId, DocumentId, DomainError, SupplierId, TenantId, UserId,
};
use ledgerpay_forms::{ApprovalStatus, CancellationStatus};
use ledgerpay_payables::{
    ChartOfAccount, OtherAllocationRequest, PaymentType, ReferenceAllocationRequest,
    ReferenceDocument, ReferenceKind, SettlementRequest,
};
use uuid::Uuid;

use crate::notifier::RecordingNotifier;
use crate::query::FindAllQuery;
use crate::service::SettlementService;
use crate::store::{InMemoryStore, Supplier};

struct Harness {
    service: Arc<SettlementService>,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    tenant: TenantId,
    maker: UserId,
    approver: UserId,
    supplier: SupplierId,
    expense_account: ChartOfAccountId,
    reference_seq: std::sync::atomic::AtomicU32,
}

fn date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 15, 10, 0, 0).unwrap()
}

fn setup() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let tenant = TenantId::new();
    let maker = UserId::new();
    let approver = UserId::new();
    let supplier = SupplierId::new();

    store
        .insert_supplier(
            tenant,
            Supplier {
                id: supplier,
                name: "Jaya Abadi".to_string(),
            },
        )
        .unwrap();

    let payable = ChartOfAccountId::new();
    let down_payment = ChartOfAccountId::new();
    let expense = ChartOfAccountId::new();
    for (id, name, is_debit) in [
        (payable, "Account Payable", false),
        (down_payment, "Purchase Down Payment", true),
        (expense, "Other Expense", true),
    ] {
        store
            .insert_chart_of_account(
                tenant,
                ChartOfAccount {
                    id,
                    name: name.to_string(),
                    is_debit,
                },
            )
            .unwrap();
    }
    store
        .insert_journal_setting(tenant, "purchase", "account payable", payable)
        .unwrap();
    store
        .insert_journal_setting(tenant, "purchase", "down payment", down_payment)
        .unwrap();

    let mut users = StaticUsers::new();
    users.insert(UserProfile::new(maker, "Maker", Some(BranchId::new())));
    users.insert(UserProfile::new(approver, "Approver", Some(BranchId::new())));

    let mut permissions = StaticPermissions::new();
    permissions.grant_all(maker);
    permissions.grant_all(approver);

    let notifier = Arc::new(RecordingNotifier::new());
    let service = Arc::new(SettlementService::new(
        Arc::clone(&store),
        Arc::new(permissions),
        Arc::new(users),
        Arc::clone(&notifier) as Arc<dyn crate::notifier::Notifier>,
    ));

    Harness {
        service,
        store,
        notifier,
        tenant,
        maker,
        approver,
        supplier,
        expense_account: expense,
        reference_seq: std::sync::atomic::AtomicU32::new(1),
    }
}

impl Harness {
    fn seed_reference(&self, kind: ReferenceKind, total: Amount) -> DocumentId {
        let seq = self
            .reference_seq
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let id = DocumentId::new();
        self.store
            .insert_reference(
                self.tenant,
                ReferenceDocument {
                    id,
                    kind,
                    number: format!("{}2101{seq:03}", kind.formable_type().number_prefix()),
                    supplier_id: self.supplier,
                    total_amount: total,
                },
                self.maker,
            )
            .unwrap();
        id
    }

    fn settlement(
        &self,
        invoices: &[(DocumentId, Amount)],
        down_payments: &[(DocumentId, Amount)],
        returns: &[(DocumentId, Amount)],
        others: &[Amount],
    ) -> SettlementRequest {
        let alloc = |(document_id, amount): &(DocumentId, Amount)| ReferenceAllocationRequest {
            document_id: *document_id,
            amount: *amount,
        };
        let invoice_total: Amount = invoices.iter().map(|(_, a)| a).sum();
        let down_payment_total: Amount = down_payments.iter().map(|(_, a)| a).sum();
        let return_total: Amount = returns.iter().map(|(_, a)| a).sum();
        let other_total: Amount = others.iter().sum();
        SettlementRequest {
            supplier_id: self.supplier,
            payment_type: PaymentType::Transfer,
            date: date(),
            invoices: invoices.iter().map(alloc).collect(),
            down_payments: down_payments.iter().map(alloc).collect(),
            returns: returns.iter().map(alloc).collect(),
            others: others
                .iter()
                .map(|amount| OtherAllocationRequest {
                    chart_of_account_id: self.expense_account,
                    amount: *amount,
                    notes: None,
                })
                .collect(),
            total_invoice_amount: invoice_total,
            total_down_payment_amount: down_payment_total,
            total_return_amount: return_total,
            total_other_amount: other_total,
            total_amount: invoice_total - down_payment_total - return_total + other_total,
            notes: None,
            request_approval_to: self.approver,
        }
    }

    fn activities(&self) -> Vec<String> {
        self.store
            .read(self.tenant, |state| {
                state.activities.iter().map(|a| a.activity.clone()).collect()
            })
            .unwrap()
    }
}

#[test]
fn worked_example_settles_for_35000() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 150_000);
    let dp = h.seed_reference(ReferenceKind::PurchaseDownPayment, 50_000);
    let ret = h.seed_reference(ReferenceKind::PurchaseReturn, 20_000);

    let request = h.settlement(
        &[(invoice, 100_000)],
        &[(dp, 50_000)],
        &[(ret, 20_000)],
        &[5_000],
    );
    let view = h.service.create(h.tenant, h.maker, request).unwrap();

    assert_eq!(view.order.amount, 35_000);
    assert_eq!(view.form.display_number(), "PP2101001");
    assert_eq!(view.form.approval, ApprovalStatus::Pending);
    assert_eq!(view.order.lines.len(), 4);

    // Fully-claimed references are flagged settled; the partial one is not.
    h.store
        .read(h.tenant, |state| {
            assert!(state.active_form(Uuid::from(dp)).unwrap().done);
            assert!(state.active_form(Uuid::from(ret)).unwrap().done);
            assert!(!state.active_form(Uuid::from(invoice)).unwrap().done);
        })
        .unwrap();

    assert_eq!(h.activities(), vec!["Created".to_string()]);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].approver, h.approver);
    assert_eq!(sent[0].form_number, "PP2101001");
    assert_eq!(sent[0].repeat.unwrap().limit, 7);
}

#[test]
fn second_settlement_cannot_overdraw_a_reference() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);

    h.service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 60_000)], &[], &[], &[]))
        .unwrap();

    let err = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 60_000)], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "insufficient available amount on PI2101001, available 40000 requested 60000"
    );
}

#[test]
fn two_lines_in_one_request_share_the_availability() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);

    let err = h
        .service
        .create(
            h.tenant,
            h.maker,
            h.settlement(&[(invoice, 60_000), (invoice, 60_000)], &[], &[], &[]),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "insufficient available amount on PI2101001, available 40000 requested 60000"
    );
}

#[test]
fn concurrent_claims_serialize_on_the_store() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = Arc::clone(&h.service);
        let request = h.settlement(&[(invoice, 60)], &[], &[], &[]);
        let tenant = h.tenant;
        let maker = h.maker;
        handles.push(thread::spawn(move || service.create(tenant, maker, request)));
    }
    let results: Vec<_> = handles.into_iter().map(|j| j.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two racing claims may win");
    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser.as_ref().unwrap_err(),
        DomainError::InsufficientAvailable { available: 40, requested: 60, .. }
    ));
}

#[test]
fn wrong_reference_kind_is_rejected() {
    let h = setup();
    let dp = h.seed_reference(ReferenceKind::PurchaseDownPayment, 50_000);

    // A down payment passed in the invoices group.
    let err = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(dp, 50_000)], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid data: PD2101001 is a purchase down payment, expected a purchase invoice"
    );
}

#[test]
fn approval_and_rejection_follow_the_asymmetry() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
    let view = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 40_000)], &[], &[], &[]))
        .unwrap();
    let order_id = view.order.id;

    // Only the requested approver may decide.
    let err = h.service.approve(h.tenant, h.maker, order_id).unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let view = h.service.approve(h.tenant, h.approver, order_id).unwrap();
    assert_eq!(view.form.approval, ApprovalStatus::Approved);

    // Re-approving is a hard error; the same holds for reject-after-approve.
    let err = h.service.approve(h.tenant, h.approver, order_id).unwrap_err();
    assert_eq!(err, DomainError::AlreadyApproved);
    let err = h
        .service
        .reject(h.tenant, h.approver, order_id, "late")
        .unwrap_err();
    assert_eq!(err, DomainError::AlreadyApproved);
}

#[test]
fn repeated_rejection_is_idempotent_and_logged_once() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
    let view = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 40_000)], &[], &[], &[]))
        .unwrap();

    h.service
        .reject(h.tenant, h.approver, view.order.id, "wrong supplier")
        .unwrap();
    let again = h
        .service
        .reject(h.tenant, h.approver, view.order.id, "still wrong")
        .unwrap();

    assert_eq!(again.form.approval, ApprovalStatus::Rejected);
    assert_eq!(again.form.approval_reason.as_deref(), Some("wrong supplier"));
    assert_eq!(
        h.activities(),
        vec!["Created".to_string(), "Rejected".to_string()]
    );
}

#[test]
fn approved_cancellation_releases_settlement_flags() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 50_000);
    let view = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 50_000)], &[], &[], &[]))
        .unwrap();
    let order_id = view.order.id;

    // Fully claimed: the reference is settled and disappears from listings.
    assert!(h.service.references(h.tenant, h.maker, h.supplier).unwrap().is_empty());

    let view = h
        .service
        .request_cancellation(h.tenant, h.maker, order_id, "duplicate entry")
        .unwrap();
    assert_eq!(view.form.cancellation, CancellationStatus::Pending);
    // The claim still holds while the cancellation is pending.
    assert!(h.service.references(h.tenant, h.maker, h.supplier).unwrap().is_empty());

    let view = h
        .service
        .approve_cancellation(h.tenant, h.approver, order_id)
        .unwrap();
    assert!(view.form.is_cancelled());

    let references = h.service.references(h.tenant, h.maker, h.supplier).unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].remaining, 50_000);

    assert_eq!(
        h.activities(),
        vec![
            "Created".to_string(),
            "Cancellation Requested".to_string(),
            "Cancelled".to_string(),
        ]
    );
}

#[test]
fn rejected_cancellation_keeps_the_claim() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 50_000);
    let view = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 50_000)], &[], &[], &[]))
        .unwrap();

    h.service
        .request_cancellation(h.tenant, h.maker, view.order.id, "by mistake")
        .unwrap();
    let view = h
        .service
        .reject_cancellation(h.tenant, h.approver, view.order.id, "keep it")
        .unwrap();

    assert_eq!(view.form.cancellation, CancellationStatus::Rejected);
    assert!(h.service.references(h.tenant, h.maker, h.supplier).unwrap().is_empty());
}

#[test]
fn edit_supersedes_the_form_and_keeps_the_number() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
    let created = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 60_000)], &[], &[], &[]))
        .unwrap();
    let old_id = created.order.id;

    // The edit bumps the claim to 80000; without releasing the old
    // revision's claim this would overdraw the invoice.
    let updated = h
        .service
        .update(h.tenant, h.maker, old_id, h.settlement(&[(invoice, 80_000)], &[], &[], &[]))
        .unwrap();

    assert_ne!(updated.order.id, old_id);
    assert_eq!(updated.form.display_number(), "PP2101001");
    assert_eq!(updated.form.approval, ApprovalStatus::Pending);

    h.store
        .read(h.tenant, |state| {
            let archived = state
                .forms
                .values()
                .find(|f| f.formable_id == Uuid::from(old_id))
                .unwrap();
            assert_eq!(archived.number, None);
            assert_eq!(archived.edited_number.as_deref(), Some("PP2101001"));
        })
        .unwrap();

    assert_eq!(
        h.activities(),
        vec!["Created".to_string(), "Update - 1".to_string()]
    );

    // Only 20000 is left after the revision.
    let err = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 30_000)], &[], &[], &[]))
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientAvailable { available: 20_000, .. }));
}

#[test]
fn find_all_shows_one_row_per_order_after_an_edit() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
    let created = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 60_000)], &[], &[], &[]))
        .unwrap();
    let updated = h
        .service
        .update(h.tenant, h.maker, created.order.id, h.settlement(&[(invoice, 80_000)], &[], &[], &[]))
        .unwrap();

    let page = h
        .service
        .find_all(
            h.tenant,
            h.maker,
            &FindAllQuery {
                date_from: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
                date_to: Some(Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap()),
                ..FindAllQuery::default()
            },
        )
        .unwrap();

    // The superseded revision stays in the store for the audit trail but
    // must not surface as a second row.
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].order.id, updated.order.id);
    assert_eq!(page.items[0].order.amount, 80_000);
    assert_eq!(page.items[0].form.display_number(), "PP2101001");
}

#[test]
fn empty_settlement_is_rejected_before_numbering() {
    let h = setup();

    let err = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid data: settlement must have at least one line"
    );

    // Nothing was persisted or notified.
    h.store
        .read(h.tenant, |state| {
            assert!(state.orders.is_empty());
            assert!(state.activities.is_empty());
        })
        .unwrap();
    assert!(h.notifier.sent().is_empty());
}

#[test]
fn downstream_payment_freezes_the_order() {
    let h = setup();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
    let view = h
        .service
        .create(h.tenant, h.maker, h.settlement(&[(invoice, 60_000)], &[], &[], &[]))
        .unwrap();
    h.store
        .register_downstream_payment(h.tenant, view.order.id, "PY2101001")
        .unwrap();

    let err = h
        .service
        .update(h.tenant, h.maker, view.order.id, h.settlement(&[(invoice, 70_000)], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "payment order already referenced by PY2101001"
    );

    let err = h
        .service
        .request_cancellation(h.tenant, h.maker, view.order.id, "too late")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "payment order already referenced by PY2101001"
    );
}

#[test]
fn find_all_filters_and_paginates() {
    let h = setup();
    for _ in 0..3 {
        let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);
        h.service
            .create(h.tenant, h.maker, h.settlement(&[(invoice, 50_000)], &[], &[], &[]))
            .unwrap();
    }
    let first_id = h
        .store
        .read(h.tenant, |state| {
            state
                .orders
                .values()
                .min_by_key(|o| Uuid::from(o.id))
                .unwrap()
                .id
        })
        .unwrap();
    h.service.approve(h.tenant, h.approver, first_id).unwrap();

    let in_range = |query: FindAllQuery| FindAllQuery {
        date_from: Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
        date_to: Some(Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap()),
        ..query
    };

    let page = h
        .service
        .find_all(h.tenant, h.maker, &in_range(FindAllQuery::default()))
        .unwrap();
    assert_eq!(page.total, 3);

    let approved = h
        .service
        .find_all(
            h.tenant,
            h.maker,
            &in_range(FindAllQuery {
                status: Some("approvalApproved".to_string()),
                ..FindAllQuery::default()
            }),
        )
        .unwrap();
    assert_eq!(approved.total, 1);
    assert_eq!(approved.items[0].order.id, first_id);

    let by_supplier = h
        .service
        .find_all(
            h.tenant,
            h.maker,
            &in_range(FindAllQuery {
                filters: vec![("supplier.name".to_string(), "jaya".to_string())],
                ..FindAllQuery::default()
            }),
        )
        .unwrap();
    assert_eq!(by_supplier.total, 3);

    let last_page = h
        .service
        .find_all(
            h.tenant,
            h.maker,
            &in_range(FindAllQuery {
                page: Some(2),
                limit: Some(2),
                ..FindAllQuery::default()
            }),
        )
        .unwrap();
    assert_eq!(last_page.total, 3);
    assert_eq!(last_page.items.len(), 1);

    let err = h
        .service
        .find_all(
            h.tenant,
            h.maker,
            &in_range(FindAllQuery {
                filters: vec![("order.secret".to_string(), "x".to_string())],
                ..FindAllQuery::default()
            }),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid data: unknown filter field order.secret");
}

#[test]
fn missing_permission_and_branch_are_forbidden() {
    let h = setup();
    let outsider = UserId::new();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);

    let err = h
        .service
        .create(h.tenant, outsider, h.settlement(&[(invoice, 10_000)], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "forbidden: missing permission purchase.payment-order.create"
    );
}

#[test]
fn missing_journal_setting_blocks_creation() {
    let h = setup();
    let tenant = TenantId::new();
    let invoice = h.seed_reference(ReferenceKind::PurchaseInvoice, 100_000);

    // A tenant with no journal configuration at all: the supplier lookup
    // fails first, so seed the supplier only.
    h.store
        .insert_supplier(
            tenant,
            Supplier {
                id: h.supplier,
                name: "Jaya Abadi".to_string(),
            },
        )
        .unwrap();
    let err = h
        .service
        .create(tenant, h.maker, h.settlement(&[(invoice, 10_000)], &[], &[], &[]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "setting journal purchase - account payable is missing"
    );
}
