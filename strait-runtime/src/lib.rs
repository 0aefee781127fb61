//! Strait Watch Runtime
//!
//! Runs analysis tasks end to end (collect, score, report) on spawned
//! tokio tasks and records their progress in an injected task store.

pub mod tasks;
pub mod runner;

pub use tasks::*;
pub use runner::*;
