//! Batch translation gateway.
//!
//! Requests flow through [`application::coordinator::RequestCoordinator`]: cache
//! hits are answered from the [`cache`], misses are batched onto the
//! translation backend by [`application::scheduler::BatchScheduler`], and new
//! translations are written back best-effort.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
