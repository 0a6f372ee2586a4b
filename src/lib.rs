//! Diagnostics for a KEF LSX II speaker's HTTP control API
//!
//! Probes whether album art served for the current track suits a small
//! embedded display, and whether HTTP standby/power-on commands actually
//! change the speaker's power state.

pub mod app;
pub mod error;
pub mod fetch;
pub mod models;
pub mod probe;
pub mod sniff;
pub mod speaker;

pub use error::{Error, Result};
