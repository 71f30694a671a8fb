//! Logo loading for the page header.
//!
//! Sources are `http(s)://` URLs, `data:` URIs and local paths. Every logo is
//! composited onto opaque white and re-encoded as JPEG, so the PDF never
//! embeds a transparent raster (some viewers paint the transparent area
//! black). Failures never abort a render; they surface as
//! [`LogoAsset::Unavailable`] and the header draws a placeholder box instead.

use crate::types::Pt;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, RgbImage};
use reqwest::blocking::Client;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(5);
const JPEG_QUALITY: u8 = 90;
pub const MAX_ASSET_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLogo {
    pub width: u32,
    pub height: u32,
    /// Baseline JPEG, always opaque RGB.
    pub jpeg: Vec<u8>,
    /// True when the source carried transparent pixels that were composited.
    pub flattened: bool,
}

impl NormalizedLogo {
    /// Largest size with the logo's aspect ratio that fits the box.
    pub fn fit_within(&self, max_width: Pt, max_height: Pt) -> (Pt, Pt) {
        if self.width == 0 || self.height == 0 {
            return (Pt::ZERO, Pt::ZERO);
        }
        let scale_w = max_width.to_f32() / self.width as f32;
        let scale_h = max_height.to_f32() / self.height as f32;
        let scale = scale_w.min(scale_h).max(0.0);
        (
            Pt::from_f32(self.width as f32 * scale),
            Pt::from_f32(self.height as f32 * scale),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetUnavailable {
    NoSource,
    Fetch(String),
    Decode(String),
    Encode(String),
}

impl fmt::Display for AssetUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetUnavailable::NoSource => write!(f, "no logo configured"),
            AssetUnavailable::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            AssetUnavailable::Decode(msg) => write!(f, "decode failed: {msg}"),
            AssetUnavailable::Encode(msg) => write!(f, "encode failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogoAsset {
    Ready(NormalizedLogo),
    Unavailable(AssetUnavailable),
}

impl LogoAsset {
    pub fn is_ready(&self) -> bool {
        matches!(self, LogoAsset::Ready(_))
    }

    pub fn logo(&self) -> Option<&NormalizedLogo> {
        match self {
            LogoAsset::Ready(logo) => Some(logo),
            LogoAsset::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetNormalizer {
    timeout: Duration,
}

impl Default for AssetNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_TIMEOUT)
    }
}

impl AssetNormalizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn normalize(&self, source: Option<&str>) -> LogoAsset {
        match self.try_normalize(source) {
            Ok(logo) => LogoAsset::Ready(logo),
            Err(reason) => LogoAsset::Unavailable(reason),
        }
    }

    fn try_normalize(&self, source: Option<&str>) -> Result<NormalizedLogo, AssetUnavailable> {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AssetUnavailable::NoSource)?;
        let bytes = self.load_bytes(source)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| AssetUnavailable::Decode(err.to_string()))?;
        let (width, height) = decoded.dimensions();
        let (rgb, flattened) = flatten_alpha(&decoded);
        let jpeg = encode_jpeg(&rgb).map_err(AssetUnavailable::Encode)?;
        Ok(NormalizedLogo {
            width,
            height,
            jpeg,
            flattened,
        })
    }

    fn load_bytes(&self, source: &str) -> Result<Vec<u8>, AssetUnavailable> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetch_url(source);
        }
        if source.starts_with("data:") {
            return parse_data_uri(source)
                .map(|(_, data)| data)
                .ok_or_else(|| AssetUnavailable::Decode("malformed data URI".to_string()));
        }
        let path = source.strip_prefix("file://").unwrap_or(source);
        std::fs::read(Path::new(path))
            .map_err(|err| AssetUnavailable::Fetch(format!("{path}: {err}")))
    }

    /// Fetches on a dedicated thread so a caller running inside an async
    /// runtime never drives the blocking client on a runtime worker.
    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, AssetUnavailable> {
        let url = url.to_string();
        let timeout = self.timeout;
        std::thread::Builder::new()
            .name("ledgerpdf-asset".to_string())
            .spawn(move || fetch_blocking(&url, timeout))
            .map_err(|err| AssetUnavailable::Fetch(err.to_string()))?
            .join()
            .map_err(|_| AssetUnavailable::Fetch("fetch thread panicked".to_string()))?
    }
}

fn fetch_blocking(url: &str, timeout: Duration) -> Result<Vec<u8>, AssetUnavailable> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| AssetUnavailable::Fetch(err.to_string()))?;
    let response = client
        .get(url)
        .send()
        .map_err(|err| AssetUnavailable::Fetch(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AssetUnavailable::Fetch(format!("HTTP {}", status.as_u16())));
    }
    if let Some(len) = response.content_length().filter(|len| *len > MAX_ASSET_BYTES) {
        return Err(AssetUnavailable::Fetch(too_large(len)));
    }
    read_capped(response, MAX_ASSET_BYTES)
}

/// Reads at most `limit` bytes; a longer body is rejected rather than truncated.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, AssetUnavailable> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|err| AssetUnavailable::Fetch(err.to_string()))?;
    if body.len() as u64 > limit {
        return Err(AssetUnavailable::Fetch(too_large(body.len() as u64)));
    }
    Ok(body)
}

fn too_large(len: u64) -> String {
    format!("logo exceeds {MAX_ASSET_BYTES} bytes ({len})")
}

/// Composites the image onto opaque white. Returns the RGB pixels and
/// whether any pixel was less than fully opaque.
pub fn flatten_alpha(image: &DynamicImage) -> (RgbImage, bool) {
    if !image.color().has_alpha() {
        return (image.to_rgb8(), false);
    }
    let rgba = image.to_rgba8();
    let mut had_alpha = false;
    let rgb = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        if a != 255 {
            had_alpha = true;
        }
        image::Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    });
    (rgb, had_alpha)
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

fn encode_jpeg(rgb: &RgbImage) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(rgb)
        .map_err(|err| err.to_string())?;
    Ok(out)
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, data_part) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part.trim())
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}
