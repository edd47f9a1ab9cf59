//! KRN portfolio admin application layer.
//!
//! Exposes the building blocks (config, state, project store, project
//! dialog, rendering) so integration tests and the `krn-admin` binary can
//! both access them.

pub mod config;
pub mod dialog;
pub mod error;
pub mod render;
pub mod state;
pub mod store;
