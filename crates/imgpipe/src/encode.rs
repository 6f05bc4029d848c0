//! Encoder dispatch.

use imgpipe_core::{ImageFormat, Result, SaveOptions};
use imgpipe_engine as engine;
use tracing::debug;

use crate::error::capture;
use crate::handle::ImageHandle;
use crate::normalize::pre_save_normalize;

/// Encodes `handle` as-is, consuming it.
///
/// PNG and WEBP go to their own encoders; every other format encodes as
/// JPEG.
pub fn encode(handle: ImageHandle, opts: &SaveOptions) -> Result<Vec<u8>> {
    handle.runtime().ensure_ready()?;
    if opts.format == ImageFormat::Webp && opts.quality != SaveOptions::default().quality {
        debug!(quality = opts.quality, "webp output is lossless, quality not applied");
    }
    let img = handle.image();
    let out = match opts.format {
        ImageFormat::Webp => engine::webpsave_buffer(img, opts.quality, opts.strip_profile),
        ImageFormat::Png => engine::pngsave_buffer(img, opts.compression, opts.interlace),
        _ => engine::jpegsave_buffer(img, opts.quality, opts.interlace, opts.strip_profile),
    }
    .map_err(capture);
    handle.release();
    let bytes = out?;
    debug!(format = %opts.format, bytes = bytes.len(), "encoded");
    Ok(bytes)
}

/// Normalizes then encodes `handle`.
pub fn save(handle: ImageHandle, opts: &SaveOptions) -> Result<Vec<u8>> {
    let handle = pre_save_normalize(handle, opts)?;
    encode(handle, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::sniff;
    use crate::testutil::{png_bytes, runtime};
    use imgpipe_core::{Error, Interpretation};

    #[test]
    fn dispatch_by_format() {
        let rt = runtime();
        for (format, expected) in [
            (ImageFormat::Jpeg, ImageFormat::Jpeg),
            (ImageFormat::Png, ImageFormat::Png),
            (ImageFormat::Webp, ImageFormat::Webp),
            (ImageFormat::Tiff, ImageFormat::Jpeg),
            (ImageFormat::Unknown, ImageFormat::Jpeg),
        ] {
            let (img, _) = ImageHandle::load(&rt, &png_bytes(9, 7, 3)).unwrap();
            let bytes = save(img, &SaveOptions::new(format)).unwrap();
            assert_eq!(sniff(&bytes), expected, "{format}");
            let (back, _) = ImageHandle::load(&rt, &bytes).unwrap();
            assert_eq!((back.width(), back.height()), (9, 7));
        }
    }

    #[test]
    fn webp_ignores_quality() {
        let rt = runtime();
        let encode_at = |quality| {
            let (img, _) = ImageHandle::load(&rt, &png_bytes(9, 7, 3)).unwrap();
            encode(img, &SaveOptions::new(ImageFormat::Webp).with_quality(quality)).unwrap()
        };
        assert_eq!(encode_at(10), encode_at(80));
    }

    #[test]
    fn encoder_failure_releases_handle() {
        let rt = runtime();
        let (img, _) = ImageHandle::load(&rt, &png_bytes(4, 4, 3)).unwrap();
        let cmyk = crate::ops::colourspace(img, Interpretation::Cmyk).unwrap();
        let probe = cmyk.probe();
        let err = encode(cmyk, &SaveOptions::new(ImageFormat::Png)).unwrap_err();
        assert!(matches!(err, Error::EngineFailure(ref m) if m.starts_with("pngsave:")), "{err:?}");
        rt.drop_cache();
        assert!(!probe.is_alive());
    }
}
