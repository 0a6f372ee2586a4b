//! Diagnostic procedures
//!
//! Each probe narrates its steps to a writer as it goes and returns a typed
//! outcome, so the CLI prints live progress and tests can assert on both.

pub mod album_art;
pub mod power;

pub use album_art::{AlbumArtOutcome, ArtProbe, ArtVerdict, ResizeAttempt, ResizeResult};
pub use power::{PowerTestTiming, SleepOutcome, WakeOutcome};

use crate::Result;
use std::io::Write;

const RULE_WIDTH: usize = 60;

pub(crate) fn hr<W: Write>(out: &mut W, ch: char) -> Result<()> {
    let rule: String = std::iter::repeat(ch).take(RULE_WIDTH).collect();
    writeln!(out, "{}", rule)?;
    Ok(())
}
