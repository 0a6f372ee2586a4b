use super::hr;
use crate::models::{PhysicalSource, SpeakerStatus};
use crate::speaker::SpeakerService;
use crate::Result;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// Pauses around the power command. The speaker needs a few seconds after
/// `setData` before `speakerStatus` reflects the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTestTiming {
    pub command_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for PowerTestTiming {
    fn default() -> Self {
        Self {
            command_delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(3),
        }
    }
}

impl PowerTestTiming {
    pub fn immediate() -> Self {
        Self {
            command_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SleepOutcome {
    Unreachable,
    AlreadyInStandby,
    CommandFailed(String),
    Success,
    /// Reached after the command; `None` means the speaker stopped answering.
    NotInStandby(Option<SpeakerStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    Unreachable,
    AlreadyOn,
    CommandFailed(String),
    /// Command accepted but the speaker went silent: HTTP cannot wake it
    /// from this standby depth.
    NoResponse,
    Success,
    Unclear(SpeakerStatus),
}

/// Status, or `None` when the speaker cannot be queried. A reply that does
/// not parse is an error, not an unreachable speaker.
async fn check_status(speaker: &dyn SpeakerService) -> Result<Option<SpeakerStatus>> {
    match speaker.speaker_status().await {
        Ok(status) => Ok(Some(status)),
        Err(e) if e.is_unreachable() => {
            warn!("Speaker status unavailable: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn seconds(delay: Duration) -> String {
    format!("{:.1}", delay.as_secs_f64())
}

async fn send_command<W: Write>(
    speaker: &dyn SpeakerService,
    source: PhysicalSource,
    out: &mut W,
) -> Result<Option<String>> {
    match speaker.set_physical_source(source.clone()).await {
        Ok(()) => {
            writeln!(out, "   Command sent successfully")?;
            Ok(None)
        }
        Err(e) => {
            writeln!(out, "   Error sending {} command: {}", source.as_str(), e)?;
            writeln!(out, "   Failed to send command")?;
            Ok(Some(e.to_string()))
        }
    }
}

pub async fn run_sleep_test<W: Write>(
    speaker: &dyn SpeakerService,
    timing: PowerTestTiming,
    out: &mut W,
) -> Result<SleepOutcome> {
    writeln!(out, "1. Checking speaker status...")?;
    let Some(initial) = check_status(speaker).await? else {
        writeln!(out, "   Cannot reach speaker")?;
        return Ok(SleepOutcome::Unreachable);
    };
    writeln!(out, "   Speaker status: {}", initial)?;

    if initial == SpeakerStatus::Standby {
        writeln!(out, "\n   Speaker is already in standby!")?;
        return Ok(SleepOutcome::AlreadyInStandby);
    }

    writeln!(out, "\n2. Sending standby command...")?;
    tokio::time::sleep(timing.command_delay).await;
    if let Some(error) = send_command(speaker, PhysicalSource::Standby, out).await? {
        return Ok(SleepOutcome::CommandFailed(error));
    }

    writeln!(out, "\n3. Waiting {} seconds...", seconds(timing.settle_delay))?;
    tokio::time::sleep(timing.settle_delay).await;

    writeln!(out, "\n4. Verifying speaker is in standby...")?;
    let status = check_status(speaker).await?;
    if status == Some(SpeakerStatus::Standby) {
        writeln!(out, "   Speaker is now in standby!")?;
        banner(out, "SUCCESS: HTTP API can put speaker to sleep!")?;
        info!("Standby verified");
        return Ok(SleepOutcome::Success);
    }

    match &status {
        Some(status) => writeln!(out, "   Speaker status: {}", status)?,
        None => writeln!(out, "   Speaker status: unreachable")?,
    }
    Ok(SleepOutcome::NotInStandby(status))
}

pub async fn run_wake_test<W: Write>(
    speaker: &dyn SpeakerService,
    timing: PowerTestTiming,
    out: &mut W,
) -> Result<WakeOutcome> {
    writeln!(out, "1. Checking initial speaker status...")?;
    let Some(initial) = check_status(speaker).await? else {
        writeln!(out, "   Cannot reach speaker - is it on the network?")?;
        writeln!(out, "   This might mean:")?;
        writeln!(out, "      - Speaker is in deep standby (network off)")?;
        writeln!(out, "      - Wrong IP address")?;
        writeln!(out, "      - Network issue")?;
        writeln!(out, "\n   Try manually waking with remote first to verify IP.")?;
        return Ok(WakeOutcome::Unreachable);
    };
    writeln!(out, "   Speaker is reachable. Status: {}", initial)?;

    if initial == SpeakerStatus::PowerOn {
        writeln!(out, "\n   Speaker is already powered on!")?;
        writeln!(out, "   Test procedure:")?;
        writeln!(out, "      1. Use physical remote to put speaker in standby")?;
        writeln!(out, "      2. Wait 30-60 seconds")?;
        writeln!(out, "      3. Run this probe again")?;
        return Ok(WakeOutcome::AlreadyOn);
    }

    writeln!(out, "\n2. Attempting to wake speaker via HTTP API...")?;
    tokio::time::sleep(timing.command_delay).await;
    if let Some(error) = send_command(speaker, PhysicalSource::PowerOn, out).await? {
        return Ok(WakeOutcome::CommandFailed(error));
    }

    writeln!(
        out,
        "\n3. Waiting {} seconds for speaker to respond...",
        seconds(timing.settle_delay)
    )?;
    tokio::time::sleep(timing.settle_delay).await;

    writeln!(out, "\n4. Checking if speaker woke up...")?;
    let outcome = match check_status(speaker).await? {
        None => {
            writeln!(out, "   Speaker not responding (might have deeper standby)")?;
            banner(out, "RESULT: HTTP API CANNOT wake from this standby state")?;
            WakeOutcome::NoResponse
        }
        Some(SpeakerStatus::PowerOn) => {
            writeln!(out, "   Speaker is now powered on!")?;
            banner(out, "SUCCESS: HTTP API CAN wake the speaker!")?;
            info!("Wake verified");
            WakeOutcome::Success
        }
        Some(other) => {
            writeln!(out, "   Speaker status is: {}", other)?;
            banner(out, "UNCLEAR: Speaker responded but didn't fully wake")?;
            WakeOutcome::Unclear(other)
        }
    };
    Ok(outcome)
}

fn banner<W: Write>(out: &mut W, message: &str) -> Result<()> {
    writeln!(out)?;
    hr(out, '=')?;
    writeln!(out, "{}", message)?;
    hr(out, '=')?;
    Ok(())
}
