use crate::{Error, Result};
use image::io::Reader as ImageReader;
use image::{ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use std::path::Path;

/// An image that decoded successfully and is ready to be stored as a media part.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub data: Vec<u8>,
    pub extension: &'static str,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// Whether the source had to be re-encoded because PowerPoint cannot read its format.
    pub transcoded: bool,
}

/// Reads and validates an image file.
pub fn load_image(path: &Path) -> Result<PreparedImage> {
    let bytes = std::fs::read(path)?;
    prepare_image(bytes)
}

/// Decodes an image fully, so corrupt or truncated files are rejected here rather than
/// producing a broken picture in the output.
///
/// PNG, JPEG, GIF, BMP and TIFF are kept byte for byte. Every other decodable format
/// (WebP in practice) is re-encoded as PNG.
pub fn prepare_image(bytes: Vec<u8>) -> Result<PreparedImage> {
    let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(Error::UnsupportedImage)?;
    let decoded = reader.decode()?;
    let (width, height) = (decoded.width(), decoded.height());

    let native = match format {
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        ImageFormat::Tiff => Some(("tiff", "image/tiff")),
        _ => None,
    };

    match native {
        Some((extension, content_type)) => Ok(PreparedImage {
            data: bytes,
            extension,
            content_type,
            width,
            height,
            transcoded: false,
        }),
        None => {
            let mut data = Vec::new();
            decoded.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)?;
            Ok(PreparedImage {
                data,
                extension: "png",
                content_type: "image/png",
                width,
                height,
                transcoded: true,
            })
        }
    }
}

/// Crop of a picture fill, in thousandths of a percent of the image per edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl SrcRect {
    pub fn to_xml(&self) -> String {
        let mut attrs = String::new();
        for (name, value) in [("l", self.left), ("t", self.top), ("r", self.right), ("b", self.bottom)] {
            if value != 0 {
                attrs.push_str(&format!(r#" {}="{}""#, name, value));
            }
        }
        format!("<a:srcRect{}/>", attrs)
    }
}

/// Crop that makes an image cover a frame without distortion, trimming the excess
/// equally from both sides. `None` when the aspect ratios already match.
pub fn crop_to_fill(image: (u32, u32), frame: (i64, i64)) -> Option<SrcRect> {
    let (image_w, image_h) = image;
    let (frame_w, frame_h) = frame;
    if image_w == 0 || image_h == 0 || frame_w <= 0 || frame_h <= 0 {
        return None;
    }

    let image_aspect = image_w as f64 / image_h as f64;
    let frame_aspect = frame_w as f64 / frame_h as f64;
    if (image_aspect - frame_aspect).abs() < 1e-9 {
        return None;
    }

    let per_side = |visible: f64| ((1.0 - visible) / 2.0 * 100_000.0).round() as i32;
    let rect = if frame_aspect > image_aspect {
        let crop = per_side(image_aspect / frame_aspect);
        SrcRect { left: 0, top: crop, right: 0, bottom: crop }
    } else {
        let crop = per_side(frame_aspect / image_aspect);
        SrcRect { left: crop, top: 0, right: crop, bottom: 0 }
    };

    (rect != SrcRect { left: 0, top: 0, right: 0, bottom: 0 }).then_some(rect)
}
