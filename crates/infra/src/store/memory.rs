use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use ledgerpay_core::{
    ChartOfAccountId, DocumentId, DomainError, DomainResult, PaymentOrderId, SupplierId, TenantId,
};
use ledgerpay_forms::{Form, FormId, FormableType, UserActivity, increment_group};
use ledgerpay_payables::{ActiveClaim, ChartOfAccount, PaymentOrder, ReferenceDocument};

use super::Supplier;

/// All rows of one tenant. Cloned at the start of a transaction and
/// swapped back in on success, so a failed transaction leaves no partial
/// writes behind.
#[derive(Debug, Clone, Default)]
pub struct TenantState {
    pub suppliers: HashMap<SupplierId, Supplier>,
    pub chart_of_accounts: HashMap<ChartOfAccountId, ChartOfAccount>,
    /// `(feature, account name) -> chart of account`.
    pub journal_settings: HashMap<(String, String), ChartOfAccountId>,
    pub references: HashMap<DocumentId, ReferenceDocument>,
    /// Forms for payment orders and reference documents alike, keyed by
    /// row id; one row per revision.
    pub forms: HashMap<FormId, Form>,
    /// Superseded revisions stay in this map for the audit trail (their
    /// form rows keep the activity history); listings join on the active
    /// form only, so they never show up twice.
    pub orders: HashMap<PaymentOrderId, PaymentOrder>,
    pub activities: Vec<UserActivity>,
    /// Per `{formable type, year-month group}` sequences.
    pub sequences: HashMap<(FormableType, u32), u32>,
    /// Downstream Payment documents claiming a payment order, by number.
    pub downstream_payments: HashMap<PaymentOrderId, String>,
}

impl TenantState {
    /// Next increment for a numbering group (first call yields 1).
    pub fn next_increment(&mut self, formable_type: FormableType, group: u32) -> u32 {
        let counter = self.sequences.entry((formable_type, group)).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Enforced-unique form number, scanning active rows only: an archived
    /// number is meant to be reused by its replacement revision.
    pub fn ensure_number_free(&self, number: &str) -> DomainResult<()> {
        if self
            .forms
            .values()
            .any(|f| f.number.as_deref() == Some(number))
        {
            return Err(DomainError::conflict(format!(
                "form number {number} already exists"
            )));
        }
        Ok(())
    }

    /// The current (non-superseded) form of a document, if any.
    pub fn active_form(&self, formable_id: Uuid) -> Option<&Form> {
        self.forms
            .values()
            .find(|f| f.formable_id == formable_id && f.number.is_some())
    }

    pub fn active_form_mut(&mut self, formable_id: Uuid) -> Option<&mut Form> {
        self.forms
            .values_mut()
            .find(|f| f.formable_id == formable_id && f.number.is_some())
    }

    /// Latest form row of a document for display: active if present,
    /// otherwise the most recently archived revision.
    pub fn display_form(&self, formable_id: Uuid) -> Option<&Form> {
        self.active_form(formable_id).or_else(|| {
            self.forms
                .values()
                .filter(|f| f.formable_id == formable_id)
                .max_by_key(|f| f.date)
        })
    }

    /// Every line claiming a reference, hydrated with the owning form's
    /// number and cancellation state. Superseded revisions do not count:
    /// their form is archived and the replacement re-claims on its own.
    pub fn claims_against(&self, document_id: DocumentId) -> Vec<ActiveClaim> {
        let mut claims = Vec::new();
        for (order_id, order) in &self.orders {
            let Some(form) = self.active_form(Uuid::from(*order_id)) else {
                continue;
            };
            for (_, doc, amount) in order.reference_lines() {
                if doc == document_id {
                    claims.push(ActiveClaim {
                        form_number: form.display_number().to_string(),
                        amount,
                        cancellation_approved: form.is_cancelled(),
                    });
                }
            }
        }
        claims
    }

    /// Archived revisions carrying a given external number.
    pub fn revision_count(&self, number: &str) -> usize {
        self.forms
            .values()
            .filter(|f| f.edited_number.as_deref() == Some(number))
            .count()
    }
}

/// In-memory store. Intended for tests and single-process deployments;
/// not optimized for performance.
///
/// One lock guards all tenants. [`InMemoryStore::transaction`] runs the
/// closure while holding the write lock, so a read-then-decide sequence
/// inside it (availability check, then line insert) is one critical
/// section: two racing claims serialize and the second one re-reads the
/// already-reduced availability.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantId, TenantState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to a tenant's rows.
    pub fn read<R>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&TenantState) -> R,
    ) -> DomainResult<R> {
        let tenants = self
            .tenants
            .read()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;
        static EMPTY: std::sync::OnceLock<TenantState> = std::sync::OnceLock::new();
        let state = tenants
            .get(&tenant_id)
            .unwrap_or_else(|| EMPTY.get_or_init(TenantState::default));
        Ok(f(state))
    }

    /// Run `f` against a working copy of the tenant's rows and commit the
    /// copy only when `f` succeeds. Errors roll the whole mutation back.
    pub fn transaction<R>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&mut TenantState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;
        let mut work = tenants.entry(tenant_id).or_default().clone();
        let out = f(&mut work)?;
        tenants.insert(tenant_id, work);
        Ok(out)
    }

    // Seeding entry points for collaborator-owned rows (suppliers,
    // accounts, references). These belong to out-of-scope workflows; the
    // settlement service only reads them.

    pub fn insert_supplier(&self, tenant_id: TenantId, supplier: Supplier) -> DomainResult<()> {
        self.transaction(tenant_id, |state| {
            state.suppliers.insert(supplier.id, supplier);
            Ok(())
        })
    }

    pub fn insert_chart_of_account(
        &self,
        tenant_id: TenantId,
        account: ChartOfAccount,
    ) -> DomainResult<()> {
        self.transaction(tenant_id, |state| {
            state.chart_of_accounts.insert(account.id, account);
            Ok(())
        })
    }

    pub fn insert_journal_setting(
        &self,
        tenant_id: TenantId,
        feature: &str,
        name: &str,
        account_id: ChartOfAccountId,
    ) -> DomainResult<()> {
        self.transaction(tenant_id, |state| {
            state
                .journal_settings
                .insert((feature.to_string(), name.to_string()), account_id);
            Ok(())
        })
    }

    /// Insert a reference document with an approved form, as its own
    /// (out-of-scope) workflow would have left it.
    pub fn insert_reference(
        &self,
        tenant_id: TenantId,
        reference: ReferenceDocument,
        created_by: ledgerpay_core::UserId,
    ) -> DomainResult<()> {
        self.transaction(tenant_id, |state| {
            let now = Utc::now();
            let formable_type = reference.kind.formable_type();
            let group = increment_group(now);
            let increment = state.next_increment(formable_type, group);
            let mut form = Form::pending(
                tenant_id,
                formable_type,
                Uuid::from(reference.id),
                reference.number.clone(),
                increment,
                group,
                now,
                None,
                created_by,
                created_by,
            );
            form.approve(created_by, now)?;
            state.forms.insert(form.id, form);
            state.references.insert(reference.id, reference);
            Ok(())
        })
    }

    /// Record a downstream Payment claiming a payment order. Settlements
    /// that are paid out can no longer be edited or cancelled.
    pub fn register_downstream_payment(
        &self,
        tenant_id: TenantId,
        order_id: PaymentOrderId,
        payment_number: impl Into<String>,
    ) -> DomainResult<()> {
        self.transaction(tenant_id, |state| {
            state
                .downstream_payments
                .insert(order_id, payment_number.into());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerpay_core::{Amount, UserId};
    use ledgerpay_payables::ReferenceKind;

    fn reference(supplier: SupplierId, total: Amount) -> ReferenceDocument {
        ReferenceDocument {
            id: DocumentId::new(),
            kind: ReferenceKind::PurchaseInvoice,
            number: "PI2101001".to_string(),
            supplier_id: supplier,
            total_amount: total,
        }
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let supplier = SupplierId::new();

        let result: DomainResult<()> = store.transaction(tenant, |state| {
            state.suppliers.insert(
                supplier,
                Supplier {
                    id: supplier,
                    name: "Ghost".to_string(),
                },
            );
            Err(DomainError::conflict("abort"))
        });
        assert!(result.is_err());

        let present = store
            .read(tenant, |state| state.suppliers.contains_key(&supplier))
            .unwrap();
        assert!(!present);
    }

    #[test]
    fn sequences_are_per_type_and_group() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();

        let (a, b, c) = store
            .transaction(tenant, |state| {
                Ok((
                    state.next_increment(FormableType::PaymentOrder, 202101),
                    state.next_increment(FormableType::PaymentOrder, 202101),
                    state.next_increment(FormableType::PaymentOrder, 202102),
                ))
            })
            .unwrap();
        assert_eq!((a, b, c), (1, 2, 1));
    }

    #[test]
    fn seeded_reference_has_an_approved_form() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let supplier = SupplierId::new();
        let doc = reference(supplier, 100_000);
        let doc_id = doc.id;

        store.insert_reference(tenant, doc, UserId::new()).unwrap();

        store
            .read(tenant, |state| {
                let form = state.active_form(Uuid::from(doc_id)).expect("form");
                assert!(form.is_approved());
                assert!(!form.done);
                assert_eq!(form.number.as_deref(), Some("PI2101001"));
            })
            .unwrap();
    }

    #[test]
    fn duplicate_active_number_is_a_conflict() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let supplier = SupplierId::new();
        store
            .insert_reference(tenant, reference(supplier, 1), UserId::new())
            .unwrap();

        let err = store
            .read(tenant, |state| state.ensure_number_free("PI2101001"))
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflict: form number PI2101001 already exists"
        );
    }
}
