//! `ledgerpay-api` — HTTP surface for the settlement workflow.

pub mod app;
pub mod context;
pub mod middleware;
