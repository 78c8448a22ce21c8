//! ModelGate Testing Framework
//!
//! Provides utilities for exercising model selection, score refresh and
//! admission control against the in-memory backends, without requiring
//! an external counter store or live telemetry.

pub mod fixtures;

pub use fixtures::{FlakyCounterStore, TestBed, init_tracing, scored_model};
pub use modelgate_core::error::EngineError;
