use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ledgerpay_core::DomainError;
use ledgerpay_payables::PaymentType;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::InvalidData(_) => (StatusCode::BAD_REQUEST, "invalid_data"),
        DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        DomainError::AmountMismatch { .. }
        | DomainError::ExceedsInvoice { .. }
        | DomainError::InsufficientAvailable { .. }
        | DomainError::InvalidSupplier { .. }
        | DomainError::JournalImbalance { .. }
        | DomainError::AlreadyReferenced(_)
        | DomainError::AlreadyApproved
        | DomainError::AlreadyRejected
        | DomainError::NotPendingCancellation
        | DomainError::ConfigurationMissing { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation")
        }
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_payment_type(s: &str) -> Result<PaymentType, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "cash" => Ok(PaymentType::Cash),
        "transfer" => Ok(PaymentType::Transfer),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_payment_type",
            "payment_type must be one of: cash, transfer",
        )),
    }
}
