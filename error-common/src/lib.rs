//! Common error handling utilities for NextMarket
//!
//! Shared by the binaries and the HTTP layer:
//!
//! - **`MarketError`**: process-level failures (startup, bind, serve, config)
//! - **Error codes**: stable string codes carried in API error envelopes so
//!   clients can branch on the failure without parsing messages
//!
//! Library crates keep their own `thiserror` enums; this crate only holds what
//! more than one crate needs to agree on.

pub mod codes;
pub mod types;

pub use codes::*;
pub use types::*;
