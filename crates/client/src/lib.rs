//! Async orchestration of remote clinker-ratio optimization jobs.
//!
//! Provides the HTTP client for the optimizer API, the endpoint traits
//! it implements, a non-overlapping progress poller, a bounded-retry
//! result fetcher, and [`session::TaskSession`], which drives one job
//! from start to a terminal state.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod poller;
pub mod session;
