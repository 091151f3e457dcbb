use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};

use crate::domain::thumbnail::{Dimensions, ThumbnailSpec};
use crate::error::TransformError;

#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub bytes: Bytes,
    pub source_format: ImageFormat,
    pub source: Dimensions,
    pub thumbnail: Dimensions,
}

/// Decodes `data`, shrinks it into the bounding box of `spec` and encodes it
/// as JPEG.
pub fn render_thumbnail(data: &[u8], spec: &ThumbnailSpec) -> Result<RenderedThumbnail, TransformError> {
    let source_format = image::guess_format(data).map_err(TransformError::Decode)?;
    let image = image::load_from_memory_with_format(data, source_format)
        .map_err(TransformError::Decode)?;

    let (width, height) = image.dimensions();
    let source = Dimensions::new(width, height);
    let target = spec.fit(source);

    let flattened = flatten(&image, spec.background);
    let resized = if target == source {
        flattened
    } else {
        imageops::resize(&flattened, target.width, target.height, FilterType::Lanczos3)
    };

    let mut encoded = Vec::new();
    resized
        .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, spec.jpeg_quality))
        .map_err(TransformError::Encode)?;

    Ok(RenderedThumbnail {
        bytes: Bytes::from(encoded),
        source_format,
        source,
        thumbnail: Dimensions::new(resized.width(), resized.height()),
    })
}

/// Drops the alpha channel by compositing every pixel over `background`.
fn flatten(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |fg: u8, bg: u8| ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8;
        Rgb([
            blend(r, background.0[0]),
            blend(g, background.0[1]),
            blend(b, background.0[2]),
        ])
    })
}
