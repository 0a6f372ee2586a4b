//! Data models and structures
//!
//! Defines the speaker API values the probes read and write, and the
//! runtime configuration loaded from the environment.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Physical power state reported by `settings:/kef/host/speakerStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerStatus {
    PowerOn,
    Standby,
    Other(String),
}

impl SpeakerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "powerOn" => SpeakerStatus::PowerOn,
            "standby" => SpeakerStatus::Standby,
            other => SpeakerStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SpeakerStatus::PowerOn => "powerOn",
            SpeakerStatus::Standby => "standby",
            SpeakerStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for SpeakerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values accepted by `settings:/kef/play/physicalSource`. Power changes go
/// through the same setting as input switching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalSource {
    PowerOn,
    Standby,
    Input(String),
}

impl PhysicalSource {
    pub fn as_str(&self) -> &str {
        match self {
            PhysicalSource::PowerOn => "powerOn",
            PhysicalSource::Standby => "standby",
            PhysicalSource::Input(name) => name,
        }
    }

    /// JSON for the `value` query parameter of `setData`.
    pub fn to_value_json(&self) -> crate::Result<String> {
        let value = PhysicalSourceValue {
            kind: "kefPhysicalSource",
            source: self.as_str(),
        };
        Ok(serde_json::to_string(&value)?)
    }
}

#[derive(Serialize)]
struct PhysicalSourceValue<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "kefPhysicalSource")]
    source: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeakerStatusEntry {
    #[serde(rename = "kefSpeakerStatus")]
    pub kef_speaker_status: String,
}

#[derive(Debug, Clone, Default)]
pub struct MetaData {
    pub artist: String,
    pub album: String,
    pub service_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct MediaData {
    pub meta_data: MetaData,
}

#[derive(Debug, Clone, Default)]
pub struct TrackRoles {
    pub title: String,
    pub icon: Option<String>,
    pub media_data: MediaData,
}

/// Fields of `player:player/data` relevant to artwork.
#[derive(Debug, Clone)]
pub struct PlayerData {
    pub state: String,
    pub track_roles: TrackRoles,
}

fn missing_state() -> String {
    "MISSING".to_string()
}

impl PlayerData {
    /// Lenient extraction: absent or mistyped fields fall back to defaults.
    pub fn from_value(value: &Value) -> Self {
        let text = |pointer: &str| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            state: text("/state").unwrap_or_else(missing_state),
            track_roles: TrackRoles {
                title: text("/trackRoles/title").unwrap_or_default(),
                icon: text("/trackRoles/icon"),
                media_data: MediaData {
                    meta_data: MetaData {
                        artist: text("/trackRoles/mediaData/metaData/artist").unwrap_or_default(),
                        album: text("/trackRoles/mediaData/metaData/album").unwrap_or_default(),
                        service_id: text("/trackRoles/mediaData/metaData/serviceID")
                            .unwrap_or_default(),
                    },
                },
            },
        }
    }

    /// Album art URL, treating an empty string as absent.
    pub fn cover_url(&self) -> Option<&str> {
        self.track_roles
            .icon
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}

/// Every distinct string in the tree that looks like an HTTP(S) URL, sorted.
pub fn collect_urls(value: &Value) -> BTreeSet<String> {
    fn walk(value: &Value, out: &mut BTreeSet<String>) {
        match value {
            Value::String(s) if s.starts_with("http") => {
                out.insert(s.clone());
            }
            Value::Array(items) => items.iter().for_each(|item| walk(item, out)),
            Value::Object(map) => map.values().for_each(|item| walk(item, out)),
            _ => {}
        }
    }

    let mut urls = BTreeSet::new();
    walk(value, &mut urls);
    urls
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub speaker_ip: String,
    pub command_delay: Duration,
    pub settle_delay: Duration,
}

const DEFAULT_SPEAKER_IP: &str = "192.168.1.217";

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            speaker_ip: std::env::var("KEF_SPEAKER_IP")
                .unwrap_or_else(|_| DEFAULT_SPEAKER_IP.to_string()),
            command_delay: duration_ms_var("KEF_COMMAND_DELAY_MS", 1000)?,
            settle_delay: duration_ms_var("KEF_SETTLE_DELAY_MS", 3000)?,
        })
    }

    pub fn with_speaker_ip(mut self, speaker_ip: String) -> Self {
        self.speaker_ip = speaker_ip;
        self
    }
}

fn duration_ms_var(name: &str, default_ms: u64) -> crate::Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => parse_millis(name, &raw),
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

fn parse_millis(name: &str, raw: &str) -> crate::Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| {
            crate::Error::Config(format!(
                "{} must be a whole number of milliseconds, got '{}'",
                name, raw
            ))
        })
}
