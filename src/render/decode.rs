use crate::foundation::error::RenderError;

/// Decode a binary or ASCII PPM/PGM stream into row-major RGB pixels.
///
/// 16-bit samples are narrowed to 8 bits; greyscale input is expanded to three channels.
pub fn decode_ppm(bytes: &[u8]) -> Result<image::RgbImage, RenderError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Pnm).map_err(|e| {
        RenderError::new(format!("renderer output is not a readable PPM/PGM image: {e}"))
    })?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p6(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut out = format!("P6\n{width} {height}\n255\n").into_bytes();
        out.extend_from_slice(pixels);
        out
    }

    #[test]
    fn decodes_rgb_rows_in_order() {
        let bytes = p6(2, 1, &[255, 0, 0, 0, 0, 255]);
        let img = decode_ppm(&bytes).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn greyscale_expands_to_three_channels() {
        let mut bytes = b"P5\n1 2\n255\n".to_vec();
        bytes.extend_from_slice(&[10, 200]);
        let img = decode_ppm(&bytes).unwrap();
        assert_eq!(img.get_pixel(0, 1).0, [200, 200, 200]);
    }

    #[test]
    fn garbage_is_a_render_error() {
        let err = decode_ppm(b"not an image").unwrap_err();
        assert!(err.message.contains("PPM"));
    }
}
