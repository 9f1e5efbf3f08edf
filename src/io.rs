// ============================================================================
// IMAGE I/O — decode files/bytes into pixel buffers, encode for export
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageOutputFormat};
use thiserror::Error;

use crate::canvas::PixelBuffer;
use crate::error::EditorError;

/// Name of the exported artifact when the caller gives none.
pub const DEFAULT_EXPORT_NAME: &str = "image.jpeg";

/// Default JPEG quality, matching a canvas `toDataURL("image/jpeg")`.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image codec error: {0}")]
    Image(#[from] ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Editor(#[from] EditorError),
}

/// Output formats the exporter can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Jpeg,
    Png,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Jpeg => "jpeg",
            SaveFormat::Png  => "png",
            SaveFormat::Bmp  => "bmp",
            SaveFormat::Tga  => "tga",
        }
    }

    /// Parse a `--format` value or a file extension. Unknown names yield None.
    pub fn from_name(name: &str) -> Option<SaveFormat> {
        match name.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(SaveFormat::Jpeg),
            "png"          => Some(SaveFormat::Png),
            "bmp"          => Some(SaveFormat::Bmp),
            "tga"          => Some(SaveFormat::Tga),
            _              => None,
        }
    }

    /// Infer from a path's extension, defaulting to JPEG.
    pub fn from_path(path: &Path) -> SaveFormat {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(SaveFormat::from_name)
            .unwrap_or_default()
    }
}

/// Decode any format supported by the `image` crate from a file.
pub fn load_image(path: &Path) -> Result<PixelBuffer, CodecError> {
    let img = image::open(path)?.to_rgba8();
    Ok(PixelBuffer::from_image(img)?)
}

/// Decode an in-memory image (e.g. bytes dropped onto the editor).
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    Ok(PixelBuffer::from_image(img)?)
}

/// Encode `buf` into `writer`. Alpha is dropped for JPEG.
pub fn encode<W: Write + std::io::Seek>(
    buf: &PixelBuffer,
    writer: &mut W,
    format: SaveFormat,
    quality: u8,
) -> Result<(), CodecError> {
    match format {
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(buf.as_image().clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Png => {
            DynamicImage::ImageRgba8(buf.as_image().clone()).write_to(writer, ImageOutputFormat::Png)?;
        }
        SaveFormat::Bmp => {
            DynamicImage::ImageRgba8(buf.as_image().clone()).write_to(writer, ImageOutputFormat::Bmp)?;
        }
        SaveFormat::Tga => {
            DynamicImage::ImageRgba8(buf.as_image().clone()).write_to(writer, ImageOutputFormat::Tga)?;
        }
    }
    Ok(())
}

/// Encode `buf` as a JPEG byte stream.
pub fn encode_jpeg(buf: &PixelBuffer, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut cursor = Cursor::new(Vec::new());
    encode(buf, &mut cursor, SaveFormat::Jpeg, quality)?;
    Ok(cursor.into_inner())
}

/// Encode and write an image to a file.
pub fn encode_and_write(
    buf: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), CodecError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode(buf, &mut writer, format, quality)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_inference() {
        assert_eq!(SaveFormat::from_path(Path::new("out/photo.PNG")), SaveFormat::Png);
        assert_eq!(SaveFormat::from_path(Path::new("photo.jpg")), SaveFormat::Jpeg);
        assert_eq!(SaveFormat::from_path(Path::new("noext")), SaveFormat::Jpeg);
        assert_eq!(SaveFormat::from_name(".tga"), Some(SaveFormat::Tga));
        assert_eq!(SaveFormat::from_name("webp"), None);
    }

    #[test]
    fn jpeg_bytes_decode_back_to_same_size() {
        let buf = PixelBuffer::filled(16, 8, [200, 40, 40, 255]).unwrap();
        let bytes = encode_jpeg(&buf, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let back = decode_image(&bytes).unwrap();
        assert_eq!(back.dimensions(), (16, 8));
        let px = back.pixel(8, 4);
        assert!(px[0] > 150 && px[1] < 90 && px[3] == 255, "{px:?}");
    }

    #[test]
    fn png_file_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut buf = PixelBuffer::filled(3, 2, [1, 2, 3, 4]).unwrap();
        buf.put_pixel(2, 1, [250, 251, 252, 253]);
        encode_and_write(&buf, &path, SaveFormat::from_path(&path), 90).unwrap();
        assert_eq!(load_image(&path).unwrap(), buf);
    }

    #[test]
    fn garbage_bytes_are_a_codec_error() {
        assert!(matches!(decode_image(b"not an image"), Err(CodecError::Image(_))));
    }
}
