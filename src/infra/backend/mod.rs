//! Translation backend adapters.

mod remote;

pub use remote::{RemoteModelBackend, RemoteModelConfig};
