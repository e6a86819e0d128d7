//! Infrastructure adapters and runtime bootstrap.

pub mod backend;
pub mod bootstrap;
pub mod error;
pub mod http;
pub mod redis_store;
pub mod telemetry;
