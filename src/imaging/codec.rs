use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{AnimationDecoder, DynamicImage, Frame};
use std::io::Cursor;

use super::ImageFormat;
use crate::error::{JunkyardError, Result};

const JPEG_QUALITY: u8 = 90;
const WEBP_QUALITY: f32 = 80.0;

/// A decoded image: a single still picture or every frame of an animated GIF
pub enum DecodedImage {
    Still(DynamicImage),
    Animated(Vec<Frame>),
}

impl DecodedImage {
    /// Collapse to a single picture, keeping only the first animation frame
    pub fn into_first_frame(self) -> Result<DynamicImage> {
        match self {
            DecodedImage::Still(image) => Ok(image),
            DecodedImage::Animated(frames) => frames
                .into_iter()
                .next()
                .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
                .ok_or_else(|| JunkyardError::UnsupportedFormat("GIF has no frames".to_string())),
        }
    }
}

/// Decode raw bytes already known to be in `format`
pub fn decode(data: &[u8], format: ImageFormat) -> Result<DecodedImage> {
    match format {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(data))?;
            let frames = decoder.into_frames().collect_frames()?;
            Ok(DecodedImage::Animated(frames))
        }
        _ => {
            let image = image::load_from_memory_with_format(data, format.to_image_crate())?;
            Ok(DecodedImage::Still(image))
        }
    }
}

/// Encode a still picture into `format`
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?;
        }
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        }
        ImageFormat::Gif => {
            buffer = encode_animation(vec![Frame::new(image.to_rgba8())])?;
        }
        ImageFormat::Webp => {
            // libwebp only accepts 8-bit RGB(A) buffers
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            let encoder = webp::Encoder::from_image(&rgba)
                .map_err(|e| JunkyardError::UnsupportedFormat(format!("WebP encoding failed: {}", e)))?;
            buffer = encoder.encode(WEBP_QUALITY).to_vec();
        }
    }

    Ok(buffer)
}

/// Encode frames as an endlessly looping animated GIF
pub fn encode_animation(frames: Vec<Frame>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(frames)?;
    }
    Ok(buffer)
}

/// Encode frames as an endlessly looping animated WebP.
///
/// Frames must share the canvas size of the first one, as GIF frames do once
/// decoded.
pub fn encode_webp_animation(frames: &[Frame]) -> Result<Vec<u8>> {
    let first = frames
        .first()
        .ok_or_else(|| JunkyardError::UnsupportedFormat("Animation has no frames".to_string()))?;
    let (width, height) = first.buffer().dimensions();

    let mut config = webp::WebPConfig::new()
        .map_err(|()| JunkyardError::UnsupportedFormat("WebP encoder configuration failed".to_string()))?;
    config.quality = WEBP_QUALITY;

    let mut encoder = webp::AnimEncoder::new(width, height, &config);
    encoder.set_loop_count(0);

    let mut timestamp: i32 = 0;
    for frame in frames {
        let buffer = frame.buffer();
        if buffer.dimensions() != (width, height) {
            return Err(JunkyardError::UnsupportedFormat(format!(
                "Frame size {:?} differs from canvas {}x{}",
                buffer.dimensions(),
                width,
                height
            )));
        }
        encoder.add_frame(webp::AnimFrame::from_rgba(buffer.as_raw(), width, height, timestamp));

        let (numer, denom) = frame.delay().numer_denom_ms();
        // zero delay plays as 100 ms
        let delay = match numer / denom.max(1) {
            0 => 100,
            ms => ms,
        };
        timestamp = timestamp.saturating_add(i32::try_from(delay).unwrap_or(i32::MAX));
    }

    let encoded = encoder
        .try_encode()
        .map_err(|e| JunkyardError::UnsupportedFormat(format!("Animated WebP encoding failed: {:?}", e)))?;
    Ok(encoded.to_vec())
}
