//! Command handlers, grouped by concern.
//!
//! Every handler runs on the event loop with exclusive access to server
//! state, terminates in an enqueued reply or a quit, and never blocks.

pub(crate) mod channel;
pub(crate) mod messaging;
pub(crate) mod oper;
pub(crate) mod query;
pub(crate) mod registration;
