//! End-to-end behaviour of load, operations, normalization and encoding.

use imgpipe::{
    encode, ops, pre_save_normalize, save, sniff, Angle, Color, Direction, Error, Extend, ImageFormat, ImageHandle,
    Interpolator, Interpretation, Runtime, SaveOptions, TextWatermark, MAX_DIMENSION,
};
use imgpipe_engine as engine;

fn runtime() -> &'static Runtime {
    let runtime = Runtime::global();
    runtime.initialize().unwrap();
    runtime
}

/// Solid image with `values` per band, as a handle.
fn solid(w: i32, h: i32, values: &[f64]) -> ImageHandle {
    let rt = runtime();
    let img = ops::black(rt, w, h, values.len() as i32).unwrap();
    ops::linear(img, &[1.0], values).unwrap()
}

/// `solid` encoded as PNG and loaded back, so it carries a real
/// interpretation.
fn loaded(w: i32, h: i32, values: &[f64]) -> ImageHandle {
    let png = encode(solid(w, h, values), &SaveOptions::new(ImageFormat::Png)).unwrap();
    ImageHandle::load(runtime(), &png).unwrap().0
}

#[test]
fn round_trip_keeps_geometry() {
    let rt = runtime();
    for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp] {
        let bytes = save(loaded(37, 21, &[10.0, 20.0, 30.0]), &SaveOptions::new(format)).unwrap();
        assert_eq!(sniff(&bytes), format);
        let (img, sniffed) = ImageHandle::load(rt, &bytes).unwrap();
        assert_eq!(sniffed, format);
        assert_eq!((img.width(), img.height()), (37, 21), "{format}");
    }
}

#[test]
fn crop_clamps_negative_origin() {
    let img = loaded(30, 30, &[1.0, 2.0, 3.0]);
    let clamped = ops::extract(img, -5, -5, 12, 8).unwrap();
    assert_eq!((clamped.width(), clamped.height()), (12, 8));

    // Same as asking for the origin directly.
    let direct = ops::extract(loaded(30, 30, &[1.0, 2.0, 3.0]), 0, 0, 12, 8).unwrap();
    let a = encode(clamped, &SaveOptions::new(ImageFormat::Png)).unwrap();
    let b = encode(direct, &SaveOptions::new(ImageFormat::Png)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn crop_over_ceiling_is_size_exceeded() {
    let img = loaded(8, 8, &[1.0, 2.0, 3.0]);
    let err = ops::extract(img, 0, 0, 4, MAX_DIMENSION + 1).unwrap_err();
    assert_eq!(
        err,
        Error::SizeExceeded { width: 4, height: MAX_DIMENSION + 1, limit: MAX_DIMENSION }
    );
}

#[test]
fn crop_outside_image_is_engine_failure() {
    let err = ops::extract(loaded(8, 8, &[1.0, 2.0, 3.0]), 6, 6, 4, 4).unwrap_err();
    assert!(err.to_string().starts_with("extract_area:"), "{err}");
}

#[test]
fn embed_with_unknown_mode_uses_background() {
    let fallback = ops::embed_mode(loaded(4, 4, &[0.0, 0.0, 0.0]), 2, 2, 8, 8, 99).unwrap();
    let explicit = ops::embed(loaded(4, 4, &[0.0, 0.0, 0.0]), 2, 2, 8, 8, Extend::Background, Color::WHITE).unwrap();
    let a = encode(fallback, &SaveOptions::new(ImageFormat::Png)).unwrap();
    let b = encode(explicit, &SaveOptions::new(ImageFormat::Png)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn flatten_only_touches_alpha_images() {
    let opts = SaveOptions::new(ImageFormat::Png).with_background(Color::new(0, 0, 255));

    let opaque = loaded(100, 100, &[200.0, 100.0, 50.0]);
    let before = encode(loaded(100, 100, &[200.0, 100.0, 50.0]), &opts).unwrap();
    let after = encode(pre_save_normalize(opaque, &opts).unwrap(), &opts).unwrap();
    assert_eq!(before, after, "opaque image changed");

    let transparent = loaded(100, 100, &[200.0, 100.0, 50.0, 0.0]);
    assert!(transparent.has_alpha());
    let flat = pre_save_normalize(transparent, &opts).unwrap();
    assert_eq!(flat.bands(), 3);
    let reference = encode(loaded(100, 100, &[0.0, 0.0, 255.0]), &opts).unwrap();
    assert_eq!(encode(flat, &opts).unwrap(), reference, "alpha 0 should show the background");
}

#[test]
fn empty_text_watermark_returns_a_handle() {
    let img = loaded(40, 30, &[5.0, 6.0, 7.0]);
    let out = ops::watermark(img, TextWatermark::new("")).unwrap();
    assert_eq!((out.width(), out.height(), out.bands()), (40, 30, 3));
    assert!(save(out, &SaveOptions::default()).is_ok());
}

#[test]
fn chained_geometry() {
    let img = loaded(16, 8, &[9.0, 9.0, 9.0]);
    let img = ops::rotate(img, Angle::D270).unwrap();
    assert_eq!((img.width(), img.height()), (8, 16));
    let img = ops::flip(img, Direction::Vertical).unwrap();
    let img = ops::zoom(img, 2).unwrap();
    assert_eq!((img.width(), img.height()), (16, 32));
    let img = ops::affine(img, 0.5, 0.5, Interpolator::Bicubic.name()).unwrap();
    assert_eq!((img.width(), img.height()), (8, 16));
    let main = loaded(20, 20, &[0.0, 0.0, 0.0]);
    let img = ops::insert(main, img, 4, 2).unwrap();
    assert_eq!((img.width(), img.height()), (20, 20));
}

#[test]
fn engine_messages_pass_through() {
    let err = ops::affine(loaded(4, 4, &[1.0, 1.0, 1.0]), 1.0, 1.0, "no-such-kernel").unwrap_err();
    let msg = err.engine_message().unwrap();
    assert!(msg.starts_with("interpolate:"), "{msg}");
    assert!(engine::error_buffer().is_empty(), "capture leaves the buffer clean");
}

#[test]
fn colourspace_helpers() {
    let rt = runtime();
    let grey = encode(solid(3, 3, &[128.0]), &SaveOptions::new(ImageFormat::Png)).unwrap();
    assert_eq!(imgpipe::interpretation_of(rt, &grey).unwrap(), Interpretation::Bw);
    assert!(imgpipe::colourspace_supported_of(rt, &grey).unwrap());
    assert_eq!(imgpipe::interpretation_of(rt, b"nope").unwrap_err(), Error::UnsupportedFormat);
}
