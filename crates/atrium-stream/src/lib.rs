//! Incremental event-stream decoding for the Atrium gateway.
//!
//! Turns a raw byte stream into typed protocol events without any network
//! knowledge. The gateway client feeds response chunks through `SseDecoder`
//! (or lets `drive` pump a whole byte stream) and receives one callback per
//! semantic event, in wire order, with the single-terminal-event invariant
//! enforced here rather than in callers.

mod decoder;
mod drive;
mod event;

pub use decoder::SseDecoder;
pub use drive::{drive, DecodeError, DriveOutcome};
pub use event::{RunStep, StreamEvent, TerminalPayload};
