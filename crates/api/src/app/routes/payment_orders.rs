use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use ledgerpay_core::{PaymentOrderId, SupplierId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_payment_order).get(list_payment_orders))
        .route("/references/:supplier_id", get(list_references))
        .route(
            "/:id",
            get(get_payment_order)
                .patch(update_payment_order)
                .delete(request_cancellation),
        )
        .route("/:id/approve", post(approve_payment_order))
        .route("/:id/reject", post(reject_payment_order))
        .route("/:id/cancellation-approve", post(approve_cancellation))
        .route("/:id/cancellation-reject", post(reject_cancellation))
}

fn parse_order_id(raw: &str) -> Result<PaymentOrderId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "invalid payment order id",
        )
    })
}

pub async fn create_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::SettlementBody>,
) -> axum::response::Response {
    let payment_type = match errors::parse_payment_type(&body.payment_type) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = match body.into_request(payment_type) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.settlements.create(ctx.tenant_id, ctx.user_id, request) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_payment_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<dto::ListParams>,
) -> axum::response::Response {
    let query = match params.into_query() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.settlements.find_all(ctx.tenant_id, ctx.user_id, &query) {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.settlements.get(ctx.tenant_id, ctx.user_id, order_id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_references(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(supplier_id): Path<String>,
) -> axum::response::Response {
    let supplier_id: SupplierId = match supplier_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id");
        }
    };
    match services
        .settlements
        .references(ctx.tenant_id, ctx.user_id, supplier_id)
    {
        Ok(references) => Json(references).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SettlementBody>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let payment_type = match errors::parse_payment_type(&body.payment_type) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let request = match body.into_request(payment_type) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services
        .settlements
        .update(ctx.tenant_id, ctx.user_id, order_id, request)
    {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Deleting a settlement means requesting its cancellation; the hard
/// delete never happens.
pub async fn request_cancellation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonBody>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.settlements.request_cancellation(
        ctx.tenant_id,
        ctx.user_id,
        order_id,
        &body.reason,
    ) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn approve_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.settlements.approve(ctx.tenant_id, ctx.user_id, order_id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reject_payment_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonBody>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services
        .settlements
        .reject(ctx.tenant_id, ctx.user_id, order_id, &body.reason)
    {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn approve_cancellation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services
        .settlements
        .approve_cancellation(ctx.tenant_id, ctx.user_id, order_id)
    {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reject_cancellation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonBody>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(response) => return response,
    };
    match services.settlements.reject_cancellation(
        ctx.tenant_id,
        ctx.user_id,
        order_id,
        &body.reason,
    ) {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
