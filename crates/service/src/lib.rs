//! Business services independent of the web framework.
//! - Auth workflows (registration, login, token issuance) over a repository
//!   abstraction so handlers and tests share one implementation.
//! - Pagination helpers for list endpoints.

pub mod auth;
pub mod pagination;
