//! Request extractors for cross-cutting concerns.
//!
//! - [`auth`]: JWT validation and the [`auth::CurrentUser`] context passed
//!   explicitly into every service call
//! - [`request_meta`]: client ip / user agent captured for audit entries

pub mod auth;
pub mod request_meta;
