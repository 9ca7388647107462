//! This module contains utilities for testing protocol engines: an in-memory channel that tracks
//!  everything an engine does, and a deterministic simulation of two terminals connected by a
//!  lossy channel.
//!
//! They are used for testing the engines themselves, but they are also exported for running
//!  simulations from demos and from downstream tests, so they are part of the crate's regular
//!  (non-#[cfg(test)]) code.

pub mod loss_model;
pub mod network_layer;
pub mod simulation;
pub mod tracking_channel;
