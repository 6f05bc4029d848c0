//! TIFF load. There is no TIFF saver.

use std::io::Cursor;

use imgpipe_core::Interpretation;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::error::{OpError, OpResult};
use crate::image::{Meta, VImage};

use super::{from_u16, from_u8, interpretation_for, no_shrink};

pub(super) fn is_a(bytes: &[u8]) -> bool {
    bytes.starts_with(b"II\x2a\x00") || bytes.starts_with(b"MM\x00\x2a")
}

pub(super) fn load(bytes: &[u8], shrink: u32) -> OpResult<VImage> {
    no_shrink("tiffload", shrink)?;
    let decode_error = |e: tiff::TiffError| OpError::new("tiffload", e.to_string());

    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(decode_error)?;
    let (width, height) = decoder.dimensions().map_err(decode_error)?;
    let color_type = decoder.colortype().map_err(decode_error)?;
    let result = decoder.read_image().map_err(decode_error)?;

    let (bands, interpretation) = match color_type {
        ColorType::Gray(8 | 16) => (1, None),
        ColorType::GrayA(8 | 16) => (2, None),
        ColorType::RGB(8 | 16) => (3, None),
        ColorType::RGBA(8 | 16) => (4, None),
        ColorType::CMYK(8) => (4, Some(Interpretation::Cmyk)),
        other => {
            return Err(OpError::new("tiffload", format!("unsupported colour type {other:?}")));
        }
    };
    let meta = Meta::default();
    match result {
        DecodingResult::U8(buf) => {
            let interpretation = interpretation.unwrap_or_else(|| interpretation_for(bands, false));
            from_u8("tiffload", width, height, bands, interpretation, &buf, meta)
        }
        DecodingResult::U16(buf) => {
            let interpretation = interpretation.unwrap_or_else(|| interpretation_for(bands, true));
            from_u16("tiffload", width, height, bands, interpretation, &buf, meta)
        }
        _ => Err(OpError::new("tiffload", "unsupported sample format")),
    }
}
