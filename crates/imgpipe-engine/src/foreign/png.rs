//! PNG load and save.

use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder};
use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult, Status};
use crate::image::VImage;
use crate::operation::call_uncached;

use super::{from_u16, from_u8, interpretation_for, no_shrink, to_u16_be, to_u8};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub(super) fn is_a(bytes: &[u8]) -> bool {
    bytes.starts_with(&SIGNATURE)
}

pub(super) fn load(bytes: &[u8], shrink: u32) -> OpResult<VImage> {
    no_shrink("pngload", shrink)?;
    let decode_error = |e: png::DecodingError| OpError::new("pngload", e.to_string());

    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    // Palette and low bit depths come out as 8-bit, tRNS as alpha.
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder.read_info().map_err(decode_error)?;
    let icc = reader.info().icc_profile.as_ref().map(|p| p.to_vec());

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| OpError::new("pngload", "cannot determine output buffer size"))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader.next_frame(&mut buf).map_err(decode_error)?;
    let buf = &buf[..info.buffer_size()];

    let bands = match info.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err(OpError::new("pngload", "palette was not expanded"));
        }
    };
    let meta = super::icc_meta(icc);
    match info.bit_depth {
        png::BitDepth::Sixteen => {
            let samples: Vec<u16> = buf.chunks_exact(2).map(BigEndian::read_u16).collect();
            let interpretation = interpretation_for(bands, true);
            from_u16("pngload", info.width, info.height, bands, interpretation, &samples, meta)
        }
        _ => {
            let interpretation = interpretation_for(bands, false);
            from_u8("pngload", info.width, info.height, bands, interpretation, buf, meta)
        }
    }
}

/// Encodes as non-interlaced PNG.
///
/// 16-bit output for `rgb16`/`grey16` images, 8-bit otherwise. Compression
/// levels 0 to 3 pick the fast deflate preset; higher levels the default one.
/// Interlacing is accepted and not written.
pub fn pngsave_buffer(img: &VImage, compression: i32, interlace: bool) -> Status<Vec<u8>> {
    call_uncached("pngsave", || save(img, compression, interlace))
}

fn save(img: &VImage, compression: i32, _interlace: bool) -> OpResult<Vec<u8>> {
    let encode_error = |e: png::EncodingError| OpError::new("pngsave", e.to_string());
    let color_type = match (img.bands(), img.interpretation()) {
        (_, Interpretation::Cmyk) => {
            return Err(OpError::new("pngsave", "cannot save cmyk image as PNG"));
        }
        (1, _) => png::ColorType::Grayscale,
        (2, _) => png::ColorType::GrayscaleAlpha,
        (3, _) => png::ColorType::Rgb,
        (4, _) => png::ColorType::Rgba,
        (n, _) => {
            return Err(OpError::new("pngsave", format!("cannot save {n}-band image as PNG")));
        }
    };
    let sixteen = matches!(img.interpretation(), Interpretation::Rgb16 | Interpretation::Grey16);
    let data = if sixteen {
        to_u16_be(img)
    } else {
        to_u8(img, img.bands() as usize)
    };

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
        encoder.set_color(color_type);
        encoder.set_depth(if sixteen { png::BitDepth::Sixteen } else { png::BitDepth::Eight });
        encoder.set_compression(if (0..=3).contains(&compression) {
            png::Compression::Fast
        } else {
            png::Compression::default()
        });
        let mut writer = encoder.write_header().map_err(encode_error)?;
        writer.write_image_data(&data).map_err(encode_error)?;
        writer.finish().map_err(encode_error)?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::load_buffer;
    use crate::foreign::tests::gradient;
    use crate::ops::testutil::{engine, image_fn, solid};

    #[test]
    fn lossless_round_trip() {
        engine();
        let src = gradient(9, 5, 4);
        let png = pngsave_buffer(&src, 6, false).unwrap();
        let img = load_buffer("pngload_buffer", &png, 1).unwrap();
        assert_eq!((img.width(), img.height(), img.bands()), (9, 5, 4));
        assert!(img.has_alpha());
        assert_eq!(img.pixels(), src.pixels());
    }

    #[test]
    fn sixteen_bit_grey() {
        engine();
        let src = image_fn(3, 2, 1, Interpretation::Grey16, |x, y, _| (x * 20000 + y * 300) as f32);
        let png = pngsave_buffer(&src, 1, false).unwrap();
        let img = load_buffer("pngload_buffer", &png, 1).unwrap();
        assert_eq!(img.interpretation(), Interpretation::Grey16);
        assert_eq!(img.pixels(), src.pixels());
    }

    #[test]
    fn compression_levels_decode_alike() {
        engine();
        let src = gradient(16, 16, 3);
        let fast = pngsave_buffer(&src, 0, false).unwrap();
        let best = pngsave_buffer(&src, 9, true).unwrap();
        let a = load_buffer("pngload_buffer", &fast, 1).unwrap();
        let b = load_buffer("pngload_buffer", &best, 1).unwrap();
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn cmyk_rejected() {
        engine();
        let img = solid(1, 1, &[0.0, 0.0, 0.0, 0.0], Interpretation::Cmyk);
        assert!(pngsave_buffer(&img, 6, false).is_err());
        crate::error::thread_shutdown();
    }
}
