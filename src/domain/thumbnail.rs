use image::Rgb;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_WIDTH: u32 = 500;
pub const DEFAULT_MAX_HEIGHT: u32 = 500;
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
pub const THUMBNAIL_SUFFIX: &str = "_thumbnail";
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Output parameters of a thumbnail. Output is always JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSpec {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
    /// Transparent pixels are composited over this color.
    pub background: Rgb<u8>,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background: Rgb([255, 255, 255]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl ThumbnailSpec {
    /// Largest size fitting the bounding box with a single uniform scale
    /// factor, never larger than the source. Each axis rounds half up and
    /// keeps at least one pixel.
    pub fn fit(&self, source: Dimensions) -> Dimensions {
        if source.width == 0 || source.height == 0 {
            return source;
        }

        let scale = (self.max_width as f64 / source.width as f64)
            .min(self.max_height as f64 / source.height as f64)
            .min(1.0);

        Dimensions {
            width: scale_axis(source.width, scale, self.max_width),
            height: scale_axis(source.height, scale, self.max_height),
        }
    }
}

fn scale_axis(length: u32, scale: f64, max: u32) -> u32 {
    let scaled = (length as f64 * scale + 0.5).floor() as u32;
    scaled.clamp(1, length.min(max).max(1))
}

/// How the destination key's extension is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionPolicy {
    /// Reuse the source key's extension even though the body is JPEG.
    #[default]
    Preserve,
    /// Always end the key in `.jpg`.
    Jpeg,
}

impl FromStr for ExtensionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(format!("unknown extension policy: {}", other)),
        }
    }
}

/// Splits `key` into `(stem, extension)` at the last `.` of its final path
/// component. Leading dots of that component never start an extension.
pub fn split_extension(key: &str) -> (&str, &str) {
    let name_start = key.rfind('/').map_or(0, |idx| idx + 1);
    let name = &key[name_start..];
    let leading_dots = name.len() - name.trim_start_matches('.').len();

    match name[leading_dots..].rfind('.') {
        Some(idx) => key.split_at(name_start + leading_dots + idx),
        None => (key, ""),
    }
}

pub fn destination_key(source_key: &str, policy: ExtensionPolicy) -> String {
    let (stem, extension) = split_extension(source_key);
    match policy {
        ExtensionPolicy::Preserve => format!("{}{}{}", stem, THUMBNAIL_SUFFIX, extension),
        ExtensionPolicy::Jpeg => format!("{}{}.jpg", stem, THUMBNAIL_SUFFIX),
    }
}
