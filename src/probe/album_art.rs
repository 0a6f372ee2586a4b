use super::hr;
use crate::fetch::{FetchedImage, ImageFetcher};
use crate::models::{collect_urls, PlayerData};
use crate::sniff::{sniff, ImageFormat, ImageInfo};
use crate::speaker::SpeakerService;
use crate::Result;
use reqwest::StatusCode;
use std::io::Write;
use std::time::Duration;

/// Largest artwork the display can buffer without memory pressure.
pub const MAX_SAFE_BYTES: usize = 64 * 1024;

/// Square sizes the round 360x360 display renders artwork at.
pub const TARGET_SIZES: [u32; 3] = [128, 180, 240];

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);
const RESIZE_TIMEOUT: Duration = Duration::from_secs(5);

/// Query conventions commonly used by image CDNs for server-side resizing.
const RESIZE_CONVENTIONS: [(&str, &[(&str, &str)]); 4] = [
    ("width/height", &[("width", "180"), ("height", "180")]),
    ("w/h", &[("w", "180"), ("h", "180")]),
    ("size", &[("size", "180")]),
    ("resize", &[("resize", "180x180")]),
];

/// Compatibility checks for a streaming JPEG decoder that pre-allocates
/// from `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtVerdict {
    pub content_length_present: bool,
    pub chunked: bool,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

impl ArtVerdict {
    pub fn evaluate(fetched: &FetchedImage, info: &ImageInfo) -> Self {
        Self {
            content_length_present: fetched.content_length.is_some(),
            chunked: fetched.is_chunked(),
            format: info.format,
            size_bytes: fetched.body.len(),
        }
    }

    pub fn within_size_cap(&self) -> bool {
        self.size_bytes <= MAX_SAFE_BYTES
    }

    pub fn compatible(&self) -> bool {
        self.content_length_present && !self.chunked && self.format == ImageFormat::Jpeg
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeResult {
    Response {
        status: StatusCode,
        size_bytes: usize,
        content_length_present: bool,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeAttempt {
    pub label: &'static str,
    pub result: ResizeResult,
}

#[derive(Debug, Clone)]
pub struct ArtProbe {
    pub fetched: FetchedImage,
    pub info: ImageInfo,
    pub verdict: ArtVerdict,
    pub resize: Vec<ResizeAttempt>,
}

#[derive(Debug, Clone)]
pub enum AlbumArtOutcome {
    NoArtwork(PlayerData),
    FetchFailed { url: String },
    Probed(Box<ArtProbe>),
}

fn kb(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

pub async fn run<W: Write>(
    speaker: &dyn SpeakerService,
    fetcher: &ImageFetcher,
    out: &mut W,
) -> Result<AlbumArtOutcome> {
    hr(out, '-')?;
    writeln!(out, "1. Fetching player:player/data")?;
    hr(out, '-')?;

    let raw = speaker.player_data().await.map_err(|e| {
        tracing::error!("Cannot reach speaker: {}", e);
        e
    })?;
    writeln!(out, "{}", serde_json::to_string_pretty(&raw)?)?;

    hr(out, '-')?;
    writeln!(out, "2. Extracting artwork fields")?;
    hr(out, '-')?;

    let player = PlayerData::from_value(&raw);
    let meta = &player.track_roles.media_data.meta_data;
    writeln!(out, "  state:      {}", player.state)?;
    writeln!(out, "  title:      {}", player.track_roles.title)?;
    writeln!(out, "  artist:     {}", meta.artist)?;
    writeln!(out, "  album:      {}", meta.album)?;
    writeln!(out, "  serviceID:  {}", meta.service_id)?;
    writeln!(out, "  icon (cover_url): {}", player.cover_url().unwrap_or("None"))?;

    let urls = collect_urls(&raw);
    if !urls.is_empty() {
        writeln!(out, "\n  All HTTP URLs found in response:")?;
        for url in &urls {
            writeln!(out, "    {}", url)?;
        }
    }

    let Some(cover_url) = player.cover_url().map(str::to_string) else {
        writeln!(out, "\n  No icon/cover URL in player data.")?;
        writeln!(out, "   Possible reasons:")?;
        writeln!(out, "   - Speaker is in standby or paused with no track loaded")?;
        writeln!(
            out,
            "   - The streaming service does not populate trackRoles.icon on this firmware"
        )?;
        writeln!(out, "   - Field name differs; check the JSON dump above for image URLs")?;
        return Ok(AlbumArtOutcome::NoArtwork(player));
    };

    hr(out, '-')?;
    writeln!(out, "3. Probing cover URL")?;
    hr(out, '-')?;

    let Some((fetched, info, verdict)) = probe_url(fetcher, &cover_url, out).await? else {
        return Ok(AlbumArtOutcome::FetchFailed { url: cover_url });
    };

    let resize = try_resize_params(fetcher, &cover_url, RESIZE_TIMEOUT, out).await?;
    write_rendering_notes(&info, out)?;

    Ok(AlbumArtOutcome::Probed(Box::new(ArtProbe {
        fetched,
        info,
        verdict,
        resize,
    })))
}

async fn probe_url<W: Write>(
    fetcher: &ImageFetcher,
    url: &str,
    out: &mut W,
) -> Result<Option<(FetchedImage, ImageInfo, ArtVerdict)>> {
    writeln!(out, "\n  URL: {}", url)?;

    let fetched = match fetcher.fetch(url, &[], IMAGE_TIMEOUT).await {
        Ok(fetched) => fetched,
        Err(e) => {
            writeln!(out, "  ERROR fetching: {}", e)?;
            return Ok(None);
        }
    };

    writeln!(out, "  HTTP status:       {}", fetched.status.as_u16())?;
    if fetched.status != StatusCode::OK {
        return Ok(None);
    }

    if fetched.redirected() {
        writeln!(
            out,
            "  Redirect chain:    {} -> {}",
            fetched.requested_url, fetched.final_url
        )?;
        writeln!(out, "  Final URL:         {}", fetched.final_url)?;
    }

    writeln!(
        out,
        "  Content-Type:      {}",
        fetched.content_type.as_deref().unwrap_or("MISSING")
    )?;
    match &fetched.content_length {
        Some(length) => writeln!(out, "  Content-Length:    {}", length)?,
        None => writeln!(out, "  Content-Length:    MISSING (decoder cannot pre-allocate)")?,
    }
    if let Some(te) = &fetched.transfer_encoding {
        writeln!(out, "  Transfer-Encoding: {}  (chunked breaks fixed buffer allocation)", te)?;
    }
    if let Some(etag) = &fetched.etag {
        writeln!(out, "  ETag:              {}  (cache revalidation possible)", etag)?;
    }
    if let Some(cc) = &fetched.cache_control {
        writeln!(out, "  Cache-Control:     {}", cc)?;
    }

    let info = sniff(&fetched.body);
    let size = fetched.body.len();
    writeln!(out, "  Actual size:       {} bytes ({:.1} KB)", size, kb(size))?;
    writeln!(out, "  Image format:      {}", info.format)?;
    if let Some(dims) = info.dimensions {
        writeln!(out, "  Dimensions:        {} px", dims)?;
    }

    let verdict = ArtVerdict::evaluate(&fetched, &info);
    write_verdict(&verdict, out)?;

    Ok(Some((fetched, info, verdict)))
}

fn write_verdict<W: Write>(verdict: &ArtVerdict, out: &mut W) -> Result<()> {
    writeln!(out)?;

    if verdict.content_length_present {
        writeln!(out, "  [ok]   Content-Length present")?;
    } else {
        writeln!(out, "  [fail] No Content-Length; http_get() must buffer until EOF")?;
    }

    if verdict.chunked {
        writeln!(out, "  [fail] Chunked encoding; buffer is allocated from Content-Length")?;
    }

    match verdict.format {
        ImageFormat::Jpeg => writeln!(out, "  [ok]   JPEG, decodable as RGB565 big-endian")?,
        ImageFormat::Png => {
            writeln!(out, "  [warn] PNG, heavier decode; consider re-encoding to JPEG")?
        }
        other => writeln!(out, "  [fail] {}, not directly usable; needs conversion", other)?,
    }

    let cap_kb = MAX_SAFE_BYTES / 1024;
    if verdict.within_size_cap() {
        writeln!(
            out,
            "  [ok]   Size {:.1} KB <= {} KB safe cap",
            kb(verdict.size_bytes),
            cap_kb
        )?;
    } else {
        writeln!(
            out,
            "  [fail] Size {:.1} KB > {} KB, will pressure PSRAM",
            kb(verdict.size_bytes),
            cap_kb
        )?;
    }

    if verdict.compatible() {
        writeln!(out, "\n  Overall: COMPATIBLE with JPEG decode + canvas render")?;
    } else {
        writeln!(out, "\n  Overall: NEEDS WORKAROUND, see notes above")?;
    }
    Ok(())
}

async fn try_resize_params<W: Write>(
    fetcher: &ImageFetcher,
    url: &str,
    timeout: Duration,
    out: &mut W,
) -> Result<Vec<ResizeAttempt>> {
    writeln!(out, "\n--- Testing resize query params ---")?;

    let clean_url = strip_query(url);
    let mut attempts = Vec::with_capacity(RESIZE_CONVENTIONS.len());

    for (label, params) in RESIZE_CONVENTIONS {
        let query: Vec<(&str, String)> = params
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect();

        let result = match fetcher.fetch(clean_url, &query, timeout).await {
            Ok(fetched) => {
                let has_length = fetched.content_length.is_some();
                writeln!(
                    out,
                    "  {:16}  HTTP {}  size={}B  Content-Length={}",
                    label,
                    fetched.status.as_u16(),
                    fetched.body.len(),
                    if has_length { "yes" } else { "no" }
                )?;
                ResizeResult::Response {
                    status: fetched.status,
                    size_bytes: fetched.body.len(),
                    content_length_present: has_length,
                }
            }
            Err(e) => {
                writeln!(out, "  {:16}  ERROR: {}", label, e)?;
                ResizeResult::Failed(e.to_string())
            }
        };

        attempts.push(ResizeAttempt { label, result });
    }

    Ok(attempts)
}

fn write_rendering_notes<W: Write>(info: &ImageInfo, out: &mut W) -> Result<()> {
    writeln!(out)?;
    hr(out, '=')?;
    writeln!(out, "4. Rendering notes for the 360x360 round display")?;
    hr(out, '=')?;
    writeln!(out, "  1. HTTP GET cover_url into a buffer sized from Content-Length")?;
    writeln!(out, "  2. Decode JPEG to RGB565 big-endian")?;
    writeln!(out, "  3. Blit the decoded buffer into the UI canvas")?;

    let Some(dims) = info.dimensions else {
        writeln!(out, "  Native dimensions unknown; cannot plan downscaling")?;
        return Ok(());
    };

    for target in TARGET_SIZES {
        let longest = dims.width.max(dims.height);
        if longest <= target {
            writeln!(out, "  {}x{}: native {} fits without scaling", target, target, dims)?;
        } else {
            writeln!(
                out,
                "  {}x{}: native {} needs {:.2}x downscale",
                target,
                target,
                dims,
                f64::from(longest) / f64::from(target)
            )?;
        }
    }
    Ok(())
}
