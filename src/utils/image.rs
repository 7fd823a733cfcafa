use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

const JPEG_QUALITY: u8 = 92;

/// Best-effort mime detection from magic bytes. Unknown payloads are reported
/// as JPEG, which the model API tolerates.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Re-encodes an image as JPEG with its longest side capped at `max_side`,
/// preserving aspect ratio. Returns `None` when the input already fits or
/// cannot be decoded, in which case the caller keeps the original bytes.
pub fn downscale_to_fit(bytes: &[u8], max_side: u32) -> Option<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).ok()?;
    let (width, height) = decoded.dimensions();
    if width <= max_side && height <= max_side {
        return None;
    }

    let resized = decoded.resize(max_side, max_side, FilterType::Lanczos3).to_rgb8();

    let mut out = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder.encode_image(&resized).ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_of_size(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&png_of_size(1, 1)), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"GIF89a\x00"), "image/gif");
        assert_eq!(sniff_mime(b"not an image"), "image/jpeg");
    }

    #[test]
    fn keeps_images_within_limit() {
        let small = png_of_size(100, 50);
        assert!(downscale_to_fit(&small, 1536).is_none());
    }

    #[test]
    fn downscales_preserving_aspect_ratio() {
        let large = png_of_size(2000, 500);
        let shrunk = downscale_to_fit(&large, 1536).unwrap();

        assert_eq!(sniff_mime(&shrunk), "image/jpeg");
        let decoded = image::load_from_memory(&shrunk).unwrap();
        assert_eq!(decoded.dimensions(), (1536, 384));
    }

    #[test]
    fn garbage_input_is_left_untouched() {
        assert!(downscale_to_fit(b"definitely not an image", 1536).is_none());
    }
}
