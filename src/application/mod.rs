//! Application services: backend execution, batching, request coordination.

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod runtime;
pub mod scheduler;
