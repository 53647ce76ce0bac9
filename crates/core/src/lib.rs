//! `portalgate-core`: shared building blocks for the request pipeline and
//! the navigation guards.
//!
//! This crate contains **pure** types (no IO, no async).

pub mod error;
pub mod id;
pub mod recovery;

pub use error::{AppError, CoreError, ErrorKind};
pub use id::RequestId;
pub use recovery::RecoveryAction;
