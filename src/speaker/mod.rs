//! Speaker control API integration
//!
//! Wraps the proprietary `getData`/`setData` HTTP endpoints the speaker
//! exposes under `/api`, behind a trait so probes can run against a mock.

pub mod client;
pub mod mock;

pub use client::KefClient;
pub use mock::MockSpeakerClient;

use crate::models::{PhysicalSource, SpeakerStatus};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SpeakerService: Send + Sync {
    /// Raw first element of `player:player/data`.
    async fn player_data(&self) -> Result<serde_json::Value>;
    async fn speaker_status(&self) -> Result<SpeakerStatus>;
    async fn set_physical_source(&self, source: PhysicalSource) -> Result<()>;
}
