//! Wire types for the taskdeck REST contract.
//!
//! Everything the client sends to or receives from the task server is
//! defined here: tasks and their patches, list filters, auth payloads, and
//! the JSON envelopes that wrap every response.

pub mod auth;
mod de;
pub mod envelope;
pub mod filter;
pub mod task;
