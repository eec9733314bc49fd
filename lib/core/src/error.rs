//! The relay's boundary result type.
//!
//! Errors stay plain enums inside a crate (`GenerationError`,
//! `MessagingError`, `DeliveryError`, ...). They are wrapped in a rootcause
//! `Report` where a failure crosses into the code that logs it: retry
//! exhaustion in the AI crate, a failed delivery batch, and startup in the
//! binary. Settle pipelines never return errors; they log the report and
//! keep the relay serving.

use rootcause::Report;

/// Result whose error is a [`Report`] over the context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
