//! `ledgerpay-auth` — actor identity and permission boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The real
//! permission backend and user directory live elsewhere; the settlement
//! service only consumes the trait contracts defined here.

pub mod permissions;
pub mod user;

pub use permissions::{Permission, PermissionDirectory, StaticPermissions};
pub use user::{StaticUsers, UserDirectory, UserProfile};
