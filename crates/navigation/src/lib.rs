//! `portalgate-navigation`: route guards and the navigation controller.
//!
//! Route table → [`Guard`] → [`NavigationController`] → [`Navigator`].
//! The controller also applies the pipeline's recovery actions, so a 401,
//! 403 or 503 anywhere ends in the same redirects as a guard rejection.

pub mod config;
pub mod controller;
pub mod guard;
pub mod navigator;
pub mod route;

pub use config::GuardConfig;
pub use controller::{NavigationController, RecoveryOutcome};
pub use guard::{Guard, GuardDecision, ReasonCode};
pub use navigator::{Destination, Navigator};
pub use route::RouteData;
