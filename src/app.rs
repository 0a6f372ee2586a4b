//! Application wiring for the speaker probes.

use crate::fetch::ImageFetcher;
use crate::models::Config;
use crate::probe::{
    album_art, hr, power, AlbumArtOutcome, PowerTestTiming, SleepOutcome, WakeOutcome,
};
use crate::speaker::{KefClient, SpeakerService};
use crate::Result;
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    AlbumArt,
    Sleep,
    Wake,
}

impl Probe {
    fn title(self) -> &'static str {
        match self {
            Probe::AlbumArt => "Album Art Compatibility Probe",
            Probe::Sleep => "Sleep Test",
            Probe::Wake => "Wake Test",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    AlbumArt(AlbumArtOutcome),
    Sleep(SleepOutcome),
    Wake(WakeOutcome),
}

/// Owns the speaker client and artwork fetcher shared by all probes.
pub struct App {
    speaker: Box<dyn SpeakerService>,
    fetcher: ImageFetcher,
    timing: PowerTestTiming,
    speaker_ip: String,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub speaker: Box<dyn SpeakerService>,
    pub fetcher: ImageFetcher,
}

impl App {
    pub fn with_services(
        services: AppServices,
        speaker_ip: String,
        timing: PowerTestTiming,
    ) -> Self {
        Self {
            speaker: services.speaker,
            fetcher: services.fetcher,
            timing,
            speaker_ip,
        }
    }

    pub fn new(config: &Config) -> Self {
        // Reuse one HTTP connection pool for speaker and artwork requests.
        let http_client = reqwest::Client::new();

        info!("Speaker: {}", config.speaker_ip);

        Self::with_services(
            AppServices {
                speaker: Box::new(KefClient::new_with_client(
                    &config.speaker_ip,
                    http_client.clone(),
                )),
                fetcher: ImageFetcher::new_with_client(http_client),
            },
            config.speaker_ip.clone(),
            PowerTestTiming {
                command_delay: config.command_delay,
                settle_delay: config.settle_delay,
            },
        )
    }

    pub async fn run<W: Write>(&self, probe: Probe, out: &mut W) -> Result<ProbeOutcome> {
        hr(out, '=')?;
        writeln!(out, "KEF LSX II {}", probe.title())?;
        hr(out, '=')?;
        writeln!(out, "\nSpeaker: {}\n", self.speaker_ip)?;

        info!("Running {:?} probe", probe);

        let speaker = self.speaker.as_ref();
        let outcome = match probe {
            Probe::AlbumArt => {
                ProbeOutcome::AlbumArt(album_art::run(speaker, &self.fetcher, out).await?)
            }
            Probe::Sleep => {
                ProbeOutcome::Sleep(power::run_sleep_test(speaker, self.timing, out).await?)
            }
            Probe::Wake => {
                ProbeOutcome::Wake(power::run_wake_test(speaker, self.timing, out).await?)
            }
        };

        out.flush()?;
        info!("Probe finished: {}", outcome_label(&outcome));
        Ok(outcome)
    }
}

fn outcome_label(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::AlbumArt(AlbumArtOutcome::NoArtwork(_)) => "no artwork".to_string(),
        ProbeOutcome::AlbumArt(AlbumArtOutcome::FetchFailed { url }) => {
            format!("artwork fetch failed for {}", url)
        }
        ProbeOutcome::AlbumArt(AlbumArtOutcome::Probed(probe)) => format!(
            "artwork {} ({})",
            probe.info.format,
            if probe.verdict.compatible() {
                "compatible"
            } else {
                "needs workaround"
            }
        ),
        ProbeOutcome::Sleep(outcome) => format!("{:?}", outcome),
        ProbeOutcome::Wake(outcome) => format!("{:?}", outcome),
    }
}
