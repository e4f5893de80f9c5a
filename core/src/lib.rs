#![deny(missing_docs)]
//! pb_core: shared building blocks (config, job model, job store, rate gate, logging).

/// Configuration helpers (AppId, dirs, load_or_init, etc.)
pub mod cfg;
/// Error taxonomy shared by the store, gate, and API layer.
pub mod error;
/// Coarse single-bucket rate gate for the API surface.
pub mod gate;
/// Ping job model: repeat modes, status, probe outcomes.
pub mod job;
/// Tracing/log initialization helpers.
pub mod logx;
/// In-memory job registry shared by the API layer and the scheduler.
pub mod store;
