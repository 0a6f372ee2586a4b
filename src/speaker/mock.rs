use super::SpeakerService;
use crate::models::{PhysicalSource, SpeakerStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted speaker. Status replies are consumed in order; `None` simulates
/// an unreachable speaker. Once the script runs out the last reply repeats.
#[derive(Clone)]
pub struct MockSpeakerClient {
    statuses: Arc<Mutex<VecDeque<Option<SpeakerStatus>>>>,
    last_status: Arc<Mutex<Option<SpeakerStatus>>>,
    player_data: Arc<Mutex<Option<Value>>>,
    sent_sources: Arc<Mutex<Vec<PhysicalSource>>>,
    should_fail_commands: Arc<Mutex<bool>>,
    status_calls: Arc<Mutex<usize>>,
}

impl MockSpeakerClient {
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(Mutex::new(VecDeque::new())),
            last_status: Arc::new(Mutex::new(None)),
            player_data: Arc::new(Mutex::new(None)),
            sent_sources: Arc::new(Mutex::new(Vec::new())),
            should_fail_commands: Arc::new(Mutex::new(false)),
            status_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_status(self, status: SpeakerStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Some(status));
        self
    }

    pub fn with_unreachable(self) -> Self {
        self.statuses.lock().unwrap().push_back(None);
        self
    }

    pub fn with_player_data(self, data: Value) -> Self {
        *self.player_data.lock().unwrap() = Some(data);
        self
    }

    pub fn with_command_failure(self, should_fail: bool) -> Self {
        *self.should_fail_commands.lock().unwrap() = should_fail;
        self
    }

    pub fn get_sent_sources(&self) -> Vec<PhysicalSource> {
        self.sent_sources.lock().unwrap().clone()
    }

    pub fn get_status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

impl Default for MockSpeakerClient {
    fn default() -> Self {
        Self::new()
    }
}

fn unreachable_error() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "mock speaker unreachable",
    ))
}

#[async_trait]
impl SpeakerService for MockSpeakerClient {
    async fn player_data(&self) -> Result<Value> {
        self.player_data
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(unreachable_error)
    }

    async fn speaker_status(&self) -> Result<SpeakerStatus> {
        *self.status_calls.lock().unwrap() += 1;

        let mut last = self.last_status.lock().unwrap();
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            *last = next;
        }

        last.clone().ok_or_else(unreachable_error)
    }

    async fn set_physical_source(&self, source: PhysicalSource) -> Result<()> {
        if *self.should_fail_commands.lock().unwrap() {
            return Err(Error::Speaker("Mock failure".to_string()));
        }

        self.sent_sources.lock().unwrap().push(source.clone());
        if let Some(status) = match source {
            PhysicalSource::PowerOn => Some(SpeakerStatus::PowerOn),
            PhysicalSource::Standby => Some(SpeakerStatus::Standby),
            PhysicalSource::Input(_) => None,
        } {
            // Commands only steer the replies once the script is exhausted.
            if self.statuses.lock().unwrap().is_empty() {
                *self.last_status.lock().unwrap() = Some(status);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_statuses_then_repeat() {
        let speaker = MockSpeakerClient::new()
            .with_status(SpeakerStatus::PowerOn)
            .with_unreachable();

        assert_eq!(speaker.speaker_status().await.unwrap(), SpeakerStatus::PowerOn);
        assert!(speaker.speaker_status().await.is_err());
        assert!(speaker.speaker_status().await.is_err());
        assert_eq!(speaker.get_status_calls(), 3);
    }

    #[tokio::test]
    async fn test_commands_update_status_after_script() {
        let speaker = MockSpeakerClient::new().with_status(SpeakerStatus::PowerOn);

        assert_eq!(speaker.speaker_status().await.unwrap(), SpeakerStatus::PowerOn);
        speaker
            .set_physical_source(PhysicalSource::Standby)
            .await
            .unwrap();
        assert_eq!(speaker.speaker_status().await.unwrap(), SpeakerStatus::Standby);
        assert_eq!(speaker.get_sent_sources(), vec![PhysicalSource::Standby]);
    }

    #[tokio::test]
    async fn test_command_failure() {
        let speaker = MockSpeakerClient::new().with_command_failure(true);
        let result = speaker.set_physical_source(PhysicalSource::PowerOn).await;
        assert!(result.is_err());
        assert!(speaker.get_sent_sources().is_empty());
    }

    #[tokio::test]
    async fn test_missing_player_data_is_error() {
        let speaker = MockSpeakerClient::new();
        assert!(speaker.player_data().await.is_err());
    }
}
