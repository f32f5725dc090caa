//! Pure domain logic for clinker-ratio optimization jobs.
//!
//! Everything in this crate is synchronous and I/O-free: job identity,
//! progress tracking, result normalization, and scenario comparison.
//! The async orchestration that drives a remote job lives in
//! `clinker-client`.

pub mod busy;
pub mod compare;
pub mod error;
pub mod normalize;
pub mod scenario;
pub mod stage;
pub mod types;
