//! Turning whatever the client sent into the fixed-size input the
//! classifier expects

use crate::classifier::Sample;
use crate::error::PredictError;
use crate::shape::SIDE;
use base64::{engine::general_purpose, Engine as _};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fmt::Debug;

/// Where the image in a request came from
pub enum ImageSource {
    /// Raw bytes of an encoded image file (PNG, JPEG, ...)
    Upload(Vec<u8>),

    /// A data URI such as `data:image/png;base64,iVBOR...`
    DataUri(String),
}

impl Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload(bytes) => write!(f, "Upload {{ <{} bytes> }}", bytes.len()),
            Self::DataUri(uri) => write!(f, "DataUri {{ <{} chars> }}", uri.len()),
        }
    }
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::DataUri(_) => "data-uri",
        }
    }

    /// Decode the source into an in-memory raster
    pub fn decode(&self) -> Result<DynamicImage, PredictError> {
        match self {
            Self::Upload(bytes) => Ok(image::load_from_memory(bytes)?),
            Self::DataUri(uri) => {
                let bytes = general_purpose::STANDARD.decode(data_uri_payload(uri))?;
                Ok(image::load_from_memory(&bytes)?)
            }
        }
    }
}

/// The base64 part of a data URI: everything after the first comma, or the
/// whole string when there is no header
fn data_uri_payload(uri: &str) -> &str {
    let uri = uri.trim();
    match uri.split_once(',') {
        Some((_, payload)) => payload.trim(),
        None => uri,
    }
}

/// How digits are drawn in incoming images. The classifier itself was
/// trained on light strokes over a dark background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    /// Light digit on a dark background, passed through unchanged
    #[default]
    LightOnDark,

    /// Dark digit on a light background, inverted before normalization
    DarkOnLight,
}

impl Polarity {
    fn apply(self, value: u8) -> u8 {
        match self {
            Self::LightOnDark => value,
            Self::DarkOnLight => 255 - value,
        }
    }
}

/// Grayscale, resize to 28x28, apply `polarity` and scale into [0, 1]
pub fn preprocess(image: &DynamicImage, polarity: Polarity) -> Result<Sample, PredictError> {
    let gray = image.to_luma8();
    let resized = imageops::resize(&gray, SIDE, SIDE, FilterType::CatmullRom);
    let pixels = resized
        .into_raw()
        .into_iter()
        .map(|v| polarity.apply(v) as f32 / 255.0)
        .collect();
    Ok(Sample::new(pixels)?)
}

/// A vertical stroke with a bar across its top, light on dark
static SELF_TEST_STROKES: Lazy<GrayImage> = Lazy::new(|| {
    GrayImage::from_fn(SIDE, SIDE, |x, y| {
        let vertical = (4..24).contains(&y) && (13..16).contains(&x);
        let horizontal = (4..7).contains(&y) && (7..21).contains(&x);
        if vertical || horizontal {
            Luma([255])
        } else {
            Luma([0])
        }
    })
});

/// The synthetic digit used by the self test, drawn the way a client with
/// the given `polarity` would draw it
pub fn self_test_image(polarity: Polarity) -> DynamicImage {
    let mut strokes = SELF_TEST_STROKES.clone();
    if polarity == Polarity::DarkOnLight {
        imageops::invert(&mut strokes);
    }
    DynamicImage::ImageLuma8(strokes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::SAMPLE_LEN;
    use image::{ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn canvas(fill: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(280, 280, Rgba([fill, fill, fill, 255])))
    }

    #[test]
    fn test_payload() {
        assert_eq!(data_uri_payload("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(data_uri_payload("  AAAA\n"), "AAAA");
        assert_eq!(data_uri_payload("a,b,c"), "b,c");
    }

    #[test]
    fn test_decode_sources_agree() {
        let bytes = png_bytes(&self_test_image(Polarity::LightOnDark));
        let uri = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&bytes)
        );
        let from_upload = ImageSource::Upload(bytes).decode().unwrap();
        let from_uri = ImageSource::DataUri(uri).decode().unwrap();
        assert_eq!(from_upload.to_luma8(), from_uri.to_luma8());
    }

    #[test]
    fn test_decode_errors() {
        let err = ImageSource::DataUri("data:image/png;base64,@@not base64@@".into())
            .decode()
            .unwrap_err();
        assert!(matches!(err, PredictError::Base64(_)));

        let err = ImageSource::Upload(b"definitely not an image".to_vec())
            .decode()
            .unwrap_err();
        assert!(matches!(err, PredictError::Image(_)));
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let sample = preprocess(&canvas(200), Polarity::LightOnDark).unwrap();
        assert_eq!(sample.pixels().len(), SAMPLE_LEN);
        assert!(sample.pixels().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_polarity() {
        let white = canvas(255);
        let kept = preprocess(&white, Polarity::LightOnDark).unwrap();
        assert!(kept.pixels().iter().all(|&p| p == 1.0));

        let inverted = preprocess(&white, Polarity::DarkOnLight).unwrap();
        assert!(inverted.pixels().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_self_test_image() {
        let light = self_test_image(Polarity::LightOnDark).to_luma8();
        assert_eq!(light.dimensions(), (SIDE, SIDE));
        assert_eq!(light.get_pixel(14, 15).0, [255]);
        assert_eq!(light.get_pixel(0, 0).0, [0]);

        // Both polarities normalize to the same sample
        let a = preprocess(&self_test_image(Polarity::LightOnDark), Polarity::LightOnDark).unwrap();
        let b = preprocess(&self_test_image(Polarity::DarkOnLight), Polarity::DarkOnLight).unwrap();
        assert_eq!(a, b);
    }
}
