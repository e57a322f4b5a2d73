use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::context::{RequestContext, TENANT_HEADER, USER_HEADER};

pub async fn context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let tenant_id = extract_id(req.headers(), TENANT_HEADER)?;
    let user_id = extract_id(req.headers(), USER_HEADER)?;

    req.extensions_mut().insert(RequestContext {
        tenant_id: tenant_id.into(),
        user_id: user_id.into(),
    });

    Ok(next.run(req).await)
}

fn extract_id(headers: &HeaderMap, name: &str) -> Result<uuid::Uuid, StatusCode> {
    let header = headers.get(name).ok_or(StatusCode::UNAUTHORIZED)?;
    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    header.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
