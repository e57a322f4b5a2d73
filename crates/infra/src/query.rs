//! Read-side listing of payment orders: status filters, free-text field
//! filters, date range and pagination.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use ledgerpay_core::{DomainError, DomainResult};
use ledgerpay_forms::{ApprovalStatus, CancellationStatus, Form};
use ledgerpay_payables::PaymentOrder;

use crate::store::TenantState;
use uuid::Uuid;

/// One payment order joined with its current form row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrderView {
    pub order: PaymentOrder,
    pub form: Form,
}

/// Listing parameters. Everything is optional; the date range defaults to
/// the last 30 days.
#[derive(Debug, Clone, Default)]
pub struct FindAllQuery {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Semicolon-joined status tokens, e.g. `"approvalPending;notDone"`.
    pub status: Option<String>,
    /// `(field path, needle)` pairs, matched as case-insensitive substrings.
    pub filters: Vec<(String, String)>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl FindAllQuery {
    fn effective_range(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = self.date_to.unwrap_or(now);
        let from = self.date_from.unwrap_or(to - Duration::days(30));
        (from, to)
    }

    fn effective_page(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).max(1);
        (page, limit)
    }
}

/// Parsed status tokens. Later tokens on the same axis overwrite earlier
/// ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFilter {
    pub approval: Option<ApprovalStatus>,
    pub cancellation: Option<CancellationStatus>,
    pub done: Option<bool>,
}

impl StatusFilter {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let mut filter = Self::default();
        for token in raw.split(';').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "done" => filter.done = Some(true),
                "notDone" => filter.done = Some(false),
                "pending" | "approvalPending" => {
                    filter.approval = Some(ApprovalStatus::Pending);
                }
                "approvalApproved" => filter.approval = Some(ApprovalStatus::Approved),
                "approvalRejected" => filter.approval = Some(ApprovalStatus::Rejected),
                "cancellationPending" => {
                    filter.cancellation = Some(CancellationStatus::Pending);
                }
                "cancellationApproved" => {
                    filter.cancellation = Some(CancellationStatus::Approved);
                }
                "cancellationRejected" => {
                    filter.cancellation = Some(CancellationStatus::Rejected);
                }
                other => {
                    return Err(DomainError::invalid_data(format!(
                        "unknown status filter {other}"
                    )));
                }
            }
        }
        Ok(filter)
    }

    fn matches(&self, form: &Form) -> bool {
        if self.approval.is_some_and(|approval| form.approval != approval) {
            return false;
        }
        if self
            .cancellation
            .is_some_and(|cancellation| form.cancellation != cancellation)
        {
            return false;
        }
        if self.done.is_some_and(|done| form.done != done) {
            return false;
        }
        true
    }
}

fn field_matches(view: &PaymentOrderView, path: &str, needle: &str) -> DomainResult<bool> {
    let haystack = match path {
        "form.number" => view.form.display_number().to_string(),
        "notes" | "form.notes" => view.form.notes.clone().unwrap_or_default(),
        "supplier.name" => view.order.supplier_name.clone(),
        "payment_type" => {
            format!("{:?}", view.order.payment_type).to_lowercase()
        }
        other => {
            return Err(DomainError::invalid_data(format!(
                "unknown filter field {other}"
            )));
        }
    };
    Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
}

/// One page of results, with the pre-pagination total for the client's
/// pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

/// Run the listing against a tenant snapshot. Orders are joined with their
/// active form row and sorted newest-first by form date. Superseded
/// revisions have no active form and are skipped, so an edited order shows
/// up once, under its current revision.
pub fn find_all(state: &TenantState, query: &FindAllQuery) -> DomainResult<Page<PaymentOrderView>> {
    let status = match &query.status {
        Some(raw) => StatusFilter::parse(raw)?,
        None => StatusFilter::default(),
    };
    let (from, to) = query.effective_range(Utc::now());

    let mut views = Vec::new();
    for order in state.orders.values() {
        let Some(form) = state.active_form(Uuid::from(order.id)) else {
            continue;
        };
        if form.date < from || form.date > to {
            continue;
        }
        if !status.matches(form) {
            continue;
        }
        let view = PaymentOrderView {
            order: order.clone(),
            form: form.clone(),
        };
        let mut keep = true;
        for (path, needle) in &query.filters {
            if !field_matches(&view, path, needle)? {
                keep = false;
                break;
            }
        }
        if keep {
            views.push(view);
        }
    }

    views.sort_by(|a, b| b.form.date.cmp(&a.form.date));

    let total = views.len();
    let (page, limit) = query.effective_page();
    let offset = ((page - 1) * limit) as usize;
    let items = views
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}
