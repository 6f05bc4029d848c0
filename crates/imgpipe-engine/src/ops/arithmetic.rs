//! Per-pixel arithmetic and band manipulation.

use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult, Status};
use crate::image::VImage;
use crate::operation::{call, Params};

use super::{band, bandalike, check_vector, element, par_rows};

/// `out = a * in + b`, per band. `a` and `b` have one element or one per band.
pub fn linear(img: &VImage, a: &[f64], b: &[f64]) -> Status<VImage> {
    call("linear", &[img], Params::new().floats(a).floats(b), || linear_kernel(img, a, b))
}

pub(crate) fn linear_kernel(img: &VImage, a: &[f64], b: &[f64]) -> OpResult<VImage> {
    check_vector("linear", a, img.bands())?;
    check_vector("linear", b, img.bands())?;
    let bands = img.bands() as usize;
    let mut out = img.pixels().to_vec();
    par_rows(&mut out, img.row_len(), |_, row| {
        for (i, v) in row.iter_mut().enumerate() {
            let c = i % bands;
            *v = (element(a, c) * *v as f64 + element(b, c)) as f32;
        }
    });
    VImage::from_samples(img.width(), img.height(), img.bands(), img.interpretation(), out, img.meta().clone())
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
        }
    }

    fn apply(self, l: f32, r: f32) -> f32 {
        match self {
            BinaryOp::Add => l + r,
            BinaryOp::Multiply => l * r,
            // division by zero gives zero
            BinaryOp::Divide => {
                if r == 0.0 { 0.0 } else { l / r }
            }
        }
    }
}

fn check_same_size(domain: &'static str, a: &VImage, b: &VImage) -> OpResult<()> {
    if a.width() != b.width() || a.height() != b.height() {
        return Err(OpError::new(
            domain,
            format!(
                "images must match in size, {}x{} vs {}x{}",
                a.width(),
                a.height(),
                b.width(),
                b.height()
            ),
        ));
    }
    Ok(())
}

fn binary(op: BinaryOp, left: &VImage, right: &VImage) -> Status<VImage> {
    call(op.name(), &[left, right], Params::new(), || {
        let domain = op.name();
        check_same_size(domain, left, right)?;
        let bands = bandalike(domain, left.bands(), right.bands())? as usize;
        let w = left.width() as usize;
        let mut out = vec![0.0f32; w * left.height() as usize * bands];
        par_rows(&mut out, w * bands, |y, row| {
            for x in 0..w {
                let (l, r) = (left.pixel(x, y), right.pixel(x, y));
                for c in 0..bands {
                    row[x * bands + c] = op.apply(band(l, c), band(r, c));
                }
            }
        });
        let source = if left.bands() as usize == bands { left } else { right };
        VImage::from_samples(
            left.width(),
            left.height(),
            bands as u32,
            source.interpretation(),
            out,
            left.meta().clone(),
        )
    })
}

/// Element-wise sum.
pub fn add(left: &VImage, right: &VImage) -> Status<VImage> {
    binary(BinaryOp::Add, left, right)
}

/// Element-wise product.
pub fn multiply(left: &VImage, right: &VImage) -> Status<VImage> {
    binary(BinaryOp::Multiply, left, right)
}

/// Element-wise quotient.
pub fn divide(left: &VImage, right: &VImage) -> Status<VImage> {
    binary(BinaryOp::Divide, left, right)
}

/// Picks `then` where `cond` is non-zero and `otherwise` elsewhere. With
/// `blend`, `cond` is a 0..255 weight mixing the two.
pub fn ifthenelse(cond: &VImage, then: &VImage, otherwise: &VImage, blend: bool) -> Status<VImage> {
    call("ifthenelse", &[cond, then, otherwise], Params::new().flag(blend), || {
        ifthenelse_kernel(cond, then, otherwise, blend)
    })
}

pub(crate) fn ifthenelse_kernel(cond: &VImage, then: &VImage, otherwise: &VImage, blend: bool) -> OpResult<VImage> {
    check_same_size("ifthenelse", cond, then)?;
    check_same_size("ifthenelse", cond, otherwise)?;
    let bands = bandalike("ifthenelse", then.bands(), otherwise.bands())?;
    let bands = bandalike("ifthenelse", bands, cond.bands())? as usize;
    let w = cond.width() as usize;
    let mut out = vec![0.0f32; w * cond.height() as usize * bands];
    par_rows(&mut out, w * bands, |y, row| {
        for x in 0..w {
            let (c, t, e) = (cond.pixel(x, y), then.pixel(x, y), otherwise.pixel(x, y));
            for b in 0..bands {
                let k = band(c, b);
                row[x * bands + b] = if blend {
                    let weight = (k / 255.0).clamp(0.0, 1.0);
                    band(t, b) * weight + band(e, b) * (1.0 - weight)
                } else if k != 0.0 {
                    band(t, b)
                } else {
                    band(e, b)
                };
            }
        }
    });
    let source = if otherwise.bands() as usize == bands { otherwise } else { then };
    VImage::from_samples(
        cond.width(),
        cond.height(),
        bands as u32,
        source.interpretation(),
        out,
        source.meta().clone(),
    )
}

/// Interpretation for an image of `bands` bands cut from one of
/// `interpretation`.
fn guess_interpretation(interpretation: Interpretation, bands: u32) -> Interpretation {
    if let Some(colour) = interpretation.colour_bands() {
        if bands == colour || bands == colour + 1 {
            return interpretation;
        }
    }
    match (bands, interpretation) {
        (1 | 2, Interpretation::Grey16 | Interpretation::Rgb16) => Interpretation::Grey16,
        (1 | 2, Interpretation::Scrgb | Interpretation::Multiband) => Interpretation::Multiband,
        (1 | 2, _) => Interpretation::Bw,
        _ => Interpretation::Multiband,
    }
}

/// Selects bands `first..first + n`.
pub fn extract_band(img: &VImage, first: i32, n: i32) -> Status<VImage> {
    call("extract_band", &[img], Params::new().int(first as i64).int(n as i64), || {
        let total = img.bands() as i64;
        if first < 0 || n < 1 || first as i64 + n as i64 > total {
            return Err(OpError::new(
                "extract_band",
                format!("bad extract band {first}+{n} of {total} bands"),
            ));
        }
        let (first, n) = (first as usize, n as usize);
        let w = img.width() as usize;
        let mut out = vec![0.0f32; w * img.height() as usize * n];
        par_rows(&mut out, w * n, |y, row| {
            for x in 0..w {
                row[x * n..(x + 1) * n].copy_from_slice(&img.pixel(x, y)[first..first + n]);
            }
        });
        VImage::from_samples(
            img.width(),
            img.height(),
            n as u32,
            guess_interpretation(img.interpretation(), n as u32),
            out,
            img.meta().clone(),
        )
    })
}

/// Appends the bands of `b` to those of `a`.
pub fn bandjoin(a: &VImage, b: &VImage) -> Status<VImage> {
    call("bandjoin", &[a, b], Params::new(), || bandjoin_kernel(a, b))
}

pub(crate) fn bandjoin_kernel(a: &VImage, b: &VImage) -> OpResult<VImage> {
    check_same_size("bandjoin", a, b)?;
    let (na, nb) = (a.bands() as usize, b.bands() as usize);
    let bands = na + nb;
    let w = a.width() as usize;
    let mut out = vec![0.0f32; w * a.height() as usize * bands];
    par_rows(&mut out, w * bands, |y, row| {
        for x in 0..w {
            let px = &mut row[x * bands..(x + 1) * bands];
            px[..na].copy_from_slice(a.pixel(x, y));
            px[na..].copy_from_slice(b.pixel(x, y));
        }
    });
    let interpretation = guess_interpretation(a.interpretation(), bands as u32);
    VImage::from_samples(a.width(), a.height(), bands as u32, interpretation, out, a.meta().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_buffer, thread_shutdown};
    use crate::ops::testutil::{engine, solid};

    #[test]
    fn linear_per_band() {
        engine();
        let img = solid(1, 1, &[10.0, 20.0, 30.0], Interpretation::Srgb);
        let out = linear(&img, &[2.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out.pixels(), &[21.0, 42.0, 63.0]);
        assert!(linear(&img, &[1.0, 2.0], &[0.0]).is_err());
        assert!(error_buffer().contains("linear: vector must have 1 or 3 elements"));
        thread_shutdown();
    }

    #[test]
    fn arithmetic_ops() {
        engine();
        let a = solid(2, 2, &[6.0], Interpretation::Bw);
        let b = solid(2, 2, &[3.0], Interpretation::Bw);
        let zero = solid(2, 2, &[0.0], Interpretation::Bw);
        assert_eq!(add(&a, &b).unwrap().pixels()[0], 9.0);
        assert_eq!(multiply(&a, &b).unwrap().pixels()[0], 18.0);
        assert_eq!(divide(&a, &b).unwrap().pixels()[0], 2.0);
        assert_eq!(divide(&a, &zero).unwrap().pixels()[0], 0.0);
    }

    #[test]
    fn arithmetic_size_mismatch() {
        engine();
        let a = solid(2, 2, &[1.0], Interpretation::Bw);
        let b = solid(3, 2, &[1.0], Interpretation::Bw);
        assert!(add(&a, &b).is_err());
        assert!(error_buffer().starts_with("add: images must match in size"));
        thread_shutdown();
    }

    #[test]
    fn select_hard_and_blend() {
        engine();
        let cond = solid(1, 1, &[255.0], Interpretation::Bw);
        let half = solid(1, 1, &[127.5], Interpretation::Bw);
        let t = solid(1, 1, &[100.0, 100.0, 100.0], Interpretation::Srgb);
        let e = solid(1, 1, &[0.0, 0.0, 0.0], Interpretation::Srgb);
        assert_eq!(ifthenelse(&cond, &t, &e, false).unwrap().pixels(), &[100.0; 3]);
        let mixed = ifthenelse(&half, &t, &e, true).unwrap();
        assert!((mixed.pixels()[0] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn band_select_and_join() {
        engine();
        let rgba = solid(1, 1, &[1.0, 2.0, 3.0, 4.0], Interpretation::Srgb);
        let rgb = extract_band(&rgba, 0, 3).unwrap();
        assert_eq!(rgb.pixels(), &[1.0, 2.0, 3.0]);
        assert_eq!(rgb.interpretation(), Interpretation::Srgb);
        let alpha = extract_band(&rgba, 3, 1).unwrap();
        assert_eq!(alpha.interpretation(), Interpretation::Bw);
        let joined = bandjoin(&rgb, &alpha).unwrap();
        assert_eq!(joined.pixels(), rgba.pixels());
        assert!(joined.has_alpha());
        assert!(extract_band(&rgba, 2, 3).is_err());
        thread_shutdown();
    }
}
