//! `arena_shared`
//!
//! Libraries shared by the client and anything speaking its protocol.
//!
//! Design goals:
//! - Deterministic where practical: fixed per-tick steps, stable ordering.
//! - Clear separation of concerns (net, math, physics, config).
//! - No `unsafe`.

pub mod config;
pub mod math;
pub mod net;
pub mod physics;
