//! Meridian Runner
//!
//! Composition root. Builds and wires the risk validator, smart router,
//! exchange connector, fill manager, and order engine, then owns the
//! background task lifecycle.

pub mod bootstrap;

pub use bootstrap::{EngineBootstrap, EngineHandle};
