//! Image encoding: decoded pixels or uploaded bytes → [`ImageAsset`].
//!
//! Every asset in a [`crate::document::Page`] is either PNG or JPEG so that
//! renderers only need to understand two encodings. Images pulled out of a
//! PDF are always written as PNG (lossless, keeps scanned text crisp).
//! Uploaded PNG/JPEG files are kept byte-for-byte; other decodable formats
//! are transcoded to PNG once, here, and never again before rendering.

use crate::document::{ImageAsset, ImageEncoding};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Encode decoded pixels as a PNG asset.
pub fn encode_png(img: &DynamicImage) -> Result<ImageAsset, image::ImageError> {
    // The PNG encoder has no floating-point colour types.
    let owned;
    let img = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            owned = DynamicImage::ImageRgba8(img.to_rgba8());
            &owned
        }
        other => other,
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());

    Ok(ImageAsset {
        encoding: ImageEncoding::Png,
        bytes: buf,
        width: img.width(),
        height: img.height(),
    })
}

/// Turn an uploaded image file into an asset, validating that it decodes.
pub fn asset_from_upload(bytes: &[u8]) -> Result<ImageAsset, image::ImageError> {
    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    let encoding = match format {
        ImageFormat::Png => ImageEncoding::Png,
        ImageFormat::Jpeg => ImageEncoding::Jpeg,
        other => {
            debug!("Transcoding {:?} upload to PNG", other);
            return encode_png(&img);
        }
    };

    Ok(ImageAsset {
        encoding,
        bytes: bytes.to_vec(),
        width: img.width(),
        height: img.height(),
    })
}

/// `data:` URI for inlining an asset into HTML.
pub fn to_data_uri(asset: &ImageAsset) -> String {
    format!(
        "data:{};base64,{}",
        asset.encoding().mime_type(),
        STANDARD.encode(asset.bytes())
    )
}

/// Decode an asset and composite any transparency onto white.
pub fn decode_flattened(asset: &ImageAsset) -> Result<RgbImage, image::ImageError> {
    let format = match asset.encoding() {
        ImageEncoding::Png => ImageFormat::Png,
        ImageEncoding::Jpeg => ImageFormat::Jpeg,
    };
    let img = image::load_from_memory_with_format(asset.bytes(), format)?;
    if !img.color().has_alpha() {
        return Ok(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let a = src[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        *dst = Rgb([blend(src[0]), blend(src[1]), blend(src[2])]);
    }
    Ok(out)
}
