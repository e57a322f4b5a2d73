//! Request/response DTOs and their mapping into domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use ledgerpay_core::{Amount, DomainResult};
use ledgerpay_infra::FindAllQuery;
use ledgerpay_payables::{
    OtherAllocationRequest, PaymentType, ReferenceAllocationRequest, SettlementRequest,
};

#[derive(Debug, Deserialize)]
pub struct ReferenceLineBody {
    pub document_id: String,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct OtherLineBody {
    pub chart_of_account_id: String,
    pub amount: Amount,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettlementBody {
    pub supplier_id: String,
    pub payment_type: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invoices: Vec<ReferenceLineBody>,
    #[serde(default)]
    pub down_payments: Vec<ReferenceLineBody>,
    #[serde(default)]
    pub returns: Vec<ReferenceLineBody>,
    #[serde(default)]
    pub others: Vec<OtherLineBody>,
    #[serde(default)]
    pub total_invoice_amount: Amount,
    #[serde(default)]
    pub total_down_payment_amount: Amount,
    #[serde(default)]
    pub total_return_amount: Amount,
    #[serde(default)]
    pub total_other_amount: Amount,
    pub total_amount: Amount,
    pub notes: Option<String>,
    pub request_approval_to: String,
}

impl SettlementBody {
    /// Parse the string ids and assemble the domain request. The payment
    /// type is pre-parsed by the handler so the invalid-value response can
    /// name the field.
    pub fn into_request(self, payment_type: PaymentType) -> DomainResult<SettlementRequest> {
        let reference_lines =
            |lines: Vec<ReferenceLineBody>| -> DomainResult<Vec<ReferenceAllocationRequest>> {
                lines
                    .into_iter()
                    .map(|l| {
                        Ok(ReferenceAllocationRequest {
                            document_id: l.document_id.parse()?,
                            amount: l.amount,
                        })
                    })
                    .collect()
            };

        Ok(SettlementRequest {
            supplier_id: self.supplier_id.parse()?,
            payment_type,
            date: self.date.unwrap_or_else(Utc::now),
            invoices: reference_lines(self.invoices)?,
            down_payments: reference_lines(self.down_payments)?,
            returns: reference_lines(self.returns)?,
            others: self
                .others
                .into_iter()
                .map(|l| {
                    Ok(OtherAllocationRequest {
                        chart_of_account_id: l.chart_of_account_id.parse()?,
                        amount: l.amount,
                        notes: l.notes,
                    })
                })
                .collect::<DomainResult<Vec<_>>>()?,
            total_invoice_amount: self.total_invoice_amount,
            total_down_payment_amount: self.total_down_payment_amount,
            total_return_amount: self.total_return_amount,
            total_other_amount: self.total_other_amount,
            total_amount: self.total_amount,
            notes: self.notes,
            request_approval_to: self.request_approval_to.parse()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    pub reason: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub status: Option<String>,
    /// Semicolon-joined `path:needle` pairs,
    /// e.g. `form.number:PP2101;supplier.name:jaya`.
    pub filter: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    pub fn into_query(self) -> DomainResult<FindAllQuery> {
        let mut filters = Vec::new();
        if let Some(raw) = &self.filter {
            for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let Some((path, needle)) = pair.split_once(':') else {
                    return Err(ledgerpay_core::DomainError::invalid_data(format!(
                        "filter segment {pair} is not path:value"
                    )));
                };
                filters.push((path.trim().to_string(), needle.trim().to_string()));
            }
        }
        Ok(FindAllQuery {
            date_from: self.date_from,
            date_to: self.date_to,
            status: self.status,
            filters,
            page: self.page,
            limit: self.limit,
        })
    }
}
