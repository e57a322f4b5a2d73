use axum::Router;

pub mod payment_orders;
pub mod system;

pub fn router() -> Router {
    Router::new().nest("/payment-order", payment_orders::router())
}
