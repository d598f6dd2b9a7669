//! Request middleware applied ahead of the handlers.

pub mod allowlist;

pub use allowlist::{allowlist_middleware, AllowlistError, IpAllowlist};
