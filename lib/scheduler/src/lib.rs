//! Debounce scheduling for chat-relay.
//!
//! This crate provides:
//!
//! - **Deferred tasks**: cancellable delayed work
//! - **Debounce scheduler**: per-conversation buffering that runs one settle
//!   pipeline once a conversation goes quiet

pub mod debounce;
pub mod deferred;

pub use debounce::{
    DEFAULT_SETTLE_DELAY, DebounceScheduler, Reservation, SettleHandler, SettleRun,
};
pub use deferred::DeferredTask;
