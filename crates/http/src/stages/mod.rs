//! Request-shaping stages, in dispatch order.
//!
//! Each stage takes the request being built and may add headers to it.
//! Loading tracking, retry and error translation wrap these in
//! [`crate::pipeline::Pipeline::dispatch`].

pub mod csrf;
pub mod headers;
pub mod token;

pub use csrf::CsrfAttacher;
pub use headers::ScopeHeaders;
pub use token::TokenInjector;
