//! Format sniffing against real encoder output.

use imgpipe::{encode, format_name, is_svg, ops, sniff, ImageFormat, ImageHandle, Runtime, SaveOptions};

fn runtime() -> &'static Runtime {
    let runtime = Runtime::global();
    runtime.initialize().unwrap();
    runtime
}

fn encoded(format: ImageFormat) -> Vec<u8> {
    let rt = runtime();
    let img = ops::black(rt, 6, 5, 3).unwrap();
    let img = ops::linear(img, &[1.0], &[30.0, 60.0, 90.0]).unwrap();
    encode(img, &SaveOptions::new(format)).unwrap()
}

/// 1x1 transparent GIF.
const GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00,
    0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

#[test]
fn every_encoder_output_sniffs_as_itself() {
    for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp] {
        let bytes = encoded(format);
        assert_eq!(sniff(&bytes), format);
        assert_eq!(format_name(&bytes), format.name());
    }
}

#[test]
fn short_buffers_never_classify() {
    let png = encoded(ImageFormat::Png);
    for len in 0..12 {
        assert_eq!(sniff(&png[..len]), ImageFormat::Unknown, "len {len}");
    }
    assert_eq!(sniff(&png[..12]), ImageFormat::Png);
}

#[test]
fn tiff_headers() {
    let mut little = b"II*\0".to_vec();
    little.resize(16, 0);
    let mut big = b"MM\0*".to_vec();
    big.resize(16, 0);
    assert_eq!(sniff(&little), ImageFormat::Tiff);
    assert_eq!(sniff(&big), ImageFormat::Tiff);
    assert_eq!(format_name(&big), "tiff");
}

#[cfg(feature = "generic")]
#[test]
fn gif_loads_through_generic_loader() {
    assert_eq!(sniff(GIF), ImageFormat::GenericNative);
    let (img, format) = ImageHandle::load(runtime(), GIF).unwrap();
    assert_eq!(format, ImageFormat::GenericNative);
    assert_eq!((img.width(), img.height()), (1, 1));
}

#[cfg(not(feature = "generic"))]
#[test]
fn gif_is_unknown_without_generic_loader() {
    assert_eq!(sniff(GIF), ImageFormat::Unknown);
    assert!(ImageHandle::load(runtime(), GIF).is_err());
}

#[test]
fn svg_is_detected_but_not_loaded() {
    let svg = br#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
  <rect width="10" height="10" fill="red"/>
</svg>
"#;
    assert!(is_svg(svg));
    assert_eq!(sniff(svg), ImageFormat::Unknown);
    assert!(!is_svg(&encoded(ImageFormat::Png)));
}
