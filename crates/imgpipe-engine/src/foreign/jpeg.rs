//! JPEG load (with shrink-on-load) and save.

use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use imgpipe_core::Interpretation;
use jpeg_decoder::PixelFormat;
use tracing::debug;

use crate::error::{OpError, OpResult, Status};
use crate::image::{Meta, VImage};
use crate::operation::call_uncached;

use super::{colour_bands, dims_u16, from_u16, from_u8, icc_meta, to_u8};

const ORIENTATION_TAG: u16 = 0x0112;

pub(super) fn is_a(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn decode_error(e: jpeg_decoder::Error) -> OpError {
    OpError::new("jpegload", e.to_string())
}

pub(super) fn load(bytes: &[u8], shrink: u32) -> OpResult<VImage> {
    if !matches!(shrink, 1 | 2 | 4 | 8) {
        return Err(OpError::new("jpegload", "shrink must be 1, 2, 4 or 8"));
    }
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder.read_info().map_err(decode_error)?;
    let info = decoder
        .info()
        .ok_or_else(|| OpError::new("jpegload", "missing frame header"))?;

    let (width, height) = if shrink > 1 {
        let want_w = (info.width as u32).div_ceil(shrink) as u16;
        let want_h = (info.height as u32).div_ceil(shrink) as u16;
        decoder.scale(want_w, want_h).map_err(decode_error)?
    } else {
        (info.width, info.height)
    };
    let (width, height) = (width as u32, height as u32);

    let pixels = decoder.decode().map_err(decode_error)?;
    let mut meta = icc_meta(decoder.icc_profile());
    meta.orientation = exif_orientation(bytes).unwrap_or(0);
    debug!(width, height, shrink, format = ?info.pixel_format, "jpegload");

    match info.pixel_format {
        PixelFormat::RGB24 => from_u8("jpegload", width, height, 3, Interpretation::Srgb, &pixels, meta),
        PixelFormat::L8 => from_u8("jpegload", width, height, 1, Interpretation::Bw, &pixels, meta),
        PixelFormat::CMYK32 => from_u8("jpegload", width, height, 4, Interpretation::Cmyk, &pixels, meta),
        PixelFormat::L16 => {
            let samples: Vec<u16> = pixels.chunks_exact(2).map(BigEndian::read_u16).collect();
            from_u16("jpegload", width, height, 1, Interpretation::Grey16, &samples, meta)
        }
    }
}

/// EXIF orientation from the first APP1 Exif segment, if any.
pub(crate) fn exif_orientation(bytes: &[u8]) -> Option<u8> {
    if !is_a(bytes) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        // Start of scan or end of image: no more metadata segments.
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let len = BigEndian::read_u16(&bytes[pos + 2..pos + 4]) as usize;
        let end = (pos + 2 + len).min(bytes.len());
        if len < 2 {
            return None;
        }
        let payload = &bytes[pos + 4..end];
        if marker == 0xE1 && payload.starts_with(b"Exif\0\0") {
            let tiff = &payload[6..];
            return match tiff.get(..2) {
                Some(b"II") => ifd0_orientation::<LittleEndian>(tiff),
                Some(b"MM") => ifd0_orientation::<BigEndian>(tiff),
                _ => None,
            };
        }
        pos = end;
    }
    None
}

fn ifd0_orientation<B: ByteOrder>(tiff: &[u8]) -> Option<u8> {
    let offset = B::read_u32(tiff.get(4..8)?) as usize;
    let count = B::read_u16(tiff.get(offset..offset + 2)?) as usize;
    for i in 0..count {
        let entry = tiff.get(offset + 2 + i * 12..offset + 14 + i * 12)?;
        if B::read_u16(&entry[0..2]) == ORIENTATION_TAG {
            let value = B::read_u16(&entry[8..10]);
            return (1..=8).contains(&value).then_some(value as u8);
        }
    }
    None
}

/// Encodes as baseline (or progressive) JPEG. Alpha is dropped.
pub fn jpegsave_buffer(img: &VImage, quality: i32, interlace: bool, strip: bool) -> Status<Vec<u8>> {
    call_uncached("jpegsave", || save(img, quality, interlace, strip))
}

fn save(img: &VImage, quality: i32, interlace: bool, strip: bool) -> OpResult<Vec<u8>> {
    use jpeg_encoder::{ColorType, Encoder};

    let encode_error = |e: jpeg_encoder::EncodingError| OpError::new("jpegsave", e.to_string());
    let (w, h) = dims_u16("jpegsave", img)?;
    let colour = colour_bands(img);
    let color_type = match (colour, img.interpretation()) {
        (1, _) => ColorType::Luma,
        (4, Interpretation::Cmyk) => ColorType::Cmyk,
        (3, _) => ColorType::Rgb,
        (n, interpretation) => {
            return Err(OpError::new(
                "jpegsave",
                format!("cannot save {n}-band {interpretation} image as JPEG"),
            ));
        }
    };
    let data = to_u8(img, colour);

    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, quality.clamp(1, 100) as u8);
    encoder.set_progressive(interlace);
    if let Some(icc) = img.meta().icc.as_ref().filter(|_| !strip) {
        encoder.add_icc_profile(icc).map_err(encode_error)?;
    }
    encoder.encode(&data, w, h, color_type).map_err(encode_error)?;
    Ok(buf)
}
