//! Foundational low-level utilities shared across Atrium crates.
//!
//! Provides the cooperative cancellation token, request-id generation, and
//! time helpers used by the gateway client, stream decoder, and action
//! runner.

pub mod cancel;
pub mod request_id;
pub mod time_utils;

pub use cancel::CooperativeCancellationToken;
pub use request_id::new_request_id;
pub use time_utils::current_unix_timestamp_ms;
