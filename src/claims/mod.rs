//! Claim sources and claim-name configuration.

pub mod config;
pub mod set;

pub use config::{CallerNameClaim, ClaimsConfig, SUBJECT_CLAIM};
pub use set::{ClaimSet, ClaimValue};
