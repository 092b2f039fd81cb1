//! Client for the asynchronous agent runtime and its webhook callback types.
//!
//! The runtime exposes a thread-scoped "create run" endpoint; once a run
//! finishes, the runtime POSTs its final state to the webhook URL the run
//! was created with.

mod callback;
mod runtime_client;

pub use callback::{
    CallbackMetadata, ContentBlock, MessageContent, RunCallback, RunMessage, RunValues,
};
pub use runtime_client::{AgentRuntimeClient, NewRun};
