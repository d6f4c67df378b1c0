//! Audit history view: criteria, pagination and the task that drives them.

mod runtime;
mod scroll;
mod session;

#[cfg(test)]
mod tests;

pub use runtime::{ScrollSettings, ViewEvent, ViewHandle};
pub use scroll::{ScrollCoalescer, ScrollSignal};
pub use session::{AuditViewSession, PendingPage, ViewSnapshot, fetch_records};
