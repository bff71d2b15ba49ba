//! External capability clients
//!
//! One client per remote service, all behind the `Capability` trait, plus
//! the shared HTTP plumbing, caller-side retry and the registry that wires
//! them from configuration and credentials.

mod traits;
mod http;
mod retry;
mod registry;
pub mod completion;
pub mod extraction;
pub mod graph;
pub mod retrieval;
pub mod scrape;
pub mod search;
pub mod speech;

#[cfg(test)]
pub mod mock;

pub use traits::*;
pub use http::truncate;
pub use retry::RetryPolicy;
pub use registry::{Capabilities, Slot};
pub use completion::{ChatMessage, Completion, CompletionRequest, Role};
