//! Geometric operations: rotate, flip, zoom, crop, embed, insert, affine
//! resampling, box shrink and tiling.

use imgpipe_core::{Angle, Direction, Extend, Interpretation};

use crate::error::{OpError, OpResult, Status};
use crate::image::{check_size, VImage};
use crate::operation::{call, Params};

use super::{band, bandalike, par_rows};

fn dim(domain: &'static str, v: i64) -> OpResult<u32> {
    u32::try_from(v).map_err(|_| OpError::new(domain, format!("bad dimension {v}")))
}

/// Allocates an output buffer after checking the geometry.
fn alloc(domain: &'static str, w: u32, h: u32, bands: u32) -> OpResult<Vec<f32>> {
    check_size(domain, w, h, bands)?;
    Ok(vec![0.0; w as usize * h as usize * bands as usize])
}

// =============================================================================
// Rotate / flip
// =============================================================================

/// Rotates by a multiple of 90 degrees, clockwise.
pub fn rot(img: &VImage, angle: Angle) -> Status<VImage> {
    call("rot", &[img], Params::new().int(angle.degrees() as i64), || {
        rot_kernel(img, angle)
    })
}

fn rot_kernel(img: &VImage, angle: Angle) -> OpResult<VImage> {
    if angle == Angle::D0 {
        return Ok(img.copy());
    }
    let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
    let (ow, oh) = match angle {
        Angle::D90 | Angle::D270 => (h, w),
        _ => (w, h),
    };
    let mut out = alloc("rot", ow as u32, oh as u32, b as u32)?;
    par_rows(&mut out, ow * b, |y, row| {
        for x in 0..ow {
            let (sx, sy) = match angle {
                Angle::D0 => (x, y),
                Angle::D90 => (y, h - 1 - x),
                Angle::D180 => (w - 1 - x, h - 1 - y),
                Angle::D270 => (w - 1 - y, x),
            };
            row[x * b..(x + 1) * b].copy_from_slice(img.pixel(sx, sy));
        }
    });
    VImage::from_samples(ow as u32, oh as u32, b as u32, img.interpretation(), out, img.meta().clone())
}

/// Mirrors the image.
pub fn flip(img: &VImage, direction: Direction) -> Status<VImage> {
    let code = match direction {
        Direction::Horizontal => 0,
        Direction::Vertical => 1,
    };
    call("flip", &[img], Params::new().int(code), || {
        let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
        let mut out = alloc("flip", w as u32, h as u32, b as u32)?;
        par_rows(&mut out, w * b, |y, row| {
            for x in 0..w {
                let (sx, sy) = match direction {
                    Direction::Horizontal => (w - 1 - x, y),
                    Direction::Vertical => (x, h - 1 - y),
                };
                row[x * b..(x + 1) * b].copy_from_slice(img.pixel(sx, sy));
            }
        });
        VImage::from_samples(w as u32, h as u32, b as u32, img.interpretation(), out, img.meta().clone())
    })
}

// =============================================================================
// Zoom / shrink / replicate
// =============================================================================

/// Integer upsampling by pixel replication.
pub fn zoom(img: &VImage, xfac: i32, yfac: i32) -> Status<VImage> {
    call("zoom", &[img], Params::new().int(xfac as i64).int(yfac as i64), || {
        if xfac < 1 || yfac < 1 {
            return Err(OpError::new("zoom", format!("zoom factors should be >= 1, got {xfac}x{yfac}")));
        }
        let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
        let ow = dim("zoom", w as i64 * xfac as i64)?;
        let oh = dim("zoom", h as i64 * yfac as i64)?;
        let mut out = alloc("zoom", ow, oh, b as u32)?;
        let (xf, yf) = (xfac as usize, yfac as usize);
        par_rows(&mut out, ow as usize * b, |y, row| {
            for x in 0..ow as usize {
                row[x * b..(x + 1) * b].copy_from_slice(img.pixel(x / xf, y / yf));
            }
        });
        VImage::from_samples(ow, oh, b as u32, img.interpretation(), out, img.meta().clone())
    })
}

/// Integer box-filter downsampling. Output size is input size divided by the
/// factor, rounded down, at least 1.
pub fn shrink(img: &VImage, xshrink: i32, yshrink: i32) -> Status<VImage> {
    call("shrink", &[img], Params::new().int(xshrink as i64).int(yshrink as i64), || {
        if xshrink < 1 || yshrink < 1 {
            return Err(OpError::new(
                "shrink",
                format!("shrink factors should be >= 1, got {xshrink}x{yshrink}"),
            ));
        }
        if xshrink == 1 && yshrink == 1 {
            return Ok(img.copy());
        }
        let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
        let (xs, ys) = (xshrink as usize, yshrink as usize);
        let ow = (w / xs).max(1);
        let oh = (h / ys).max(1);
        let mut out = alloc("shrink", ow as u32, oh as u32, b as u32)?;
        par_rows(&mut out, ow * b, |y, row| {
            let y0 = y * ys;
            let y1 = (y0 + ys).min(h);
            for x in 0..ow {
                let x0 = x * xs;
                let x1 = (x0 + xs).min(w);
                let n = ((y1 - y0) * (x1 - x0)) as f32;
                for c in 0..b {
                    let mut sum = 0.0f32;
                    for sy in y0..y1 {
                        for sx in x0..x1 {
                            sum += img.pixel(sx, sy)[c];
                        }
                    }
                    row[x * b + c] = sum / n;
                }
            }
        });
        VImage::from_samples(ow as u32, oh as u32, b as u32, img.interpretation(), out, img.meta().clone())
    })
}

/// Tiles the image `across` times horizontally and `down` times vertically.
pub fn replicate(img: &VImage, across: i32, down: i32) -> Status<VImage> {
    call("replicate", &[img], Params::new().int(across as i64).int(down as i64), || {
        replicate_kernel(img, across, down)
    })
}

pub(crate) fn replicate_kernel(img: &VImage, across: i32, down: i32) -> OpResult<VImage> {
    if across < 1 || down < 1 {
        return Err(OpError::new("replicate", "replicate counts should be >= 1"));
    }
    let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
    let ow = dim("replicate", w as i64 * across as i64)?;
    let oh = dim("replicate", h as i64 * down as i64)?;
    let mut out = alloc("replicate", ow, oh, b as u32)?;
    par_rows(&mut out, ow as usize * b, |y, row| {
        for x in 0..ow as usize {
            row[x * b..(x + 1) * b].copy_from_slice(img.pixel(x % w, y % h));
        }
    });
    VImage::from_samples(ow, oh, b as u32, img.interpretation(), out, img.meta().clone())
}

// =============================================================================
// Extract / embed / insert
// =============================================================================

/// Cuts a rectangle out of the image. The rectangle must lie inside it.
pub fn extract_area(img: &VImage, left: i32, top: i32, width: i32, height: i32) -> Status<VImage> {
    let params = Params::new().int(left as i64).int(top as i64).int(width as i64).int(height as i64);
    call("extract_area", &[img], params, || {
        extract_kernel(img, left, top, width, height)
    })
}

pub(crate) fn extract_kernel(img: &VImage, left: i32, top: i32, width: i32, height: i32) -> OpResult<VImage> {
    let (w, h) = (img.width() as i64, img.height() as i64);
    if left < 0
        || top < 0
        || width <= 0
        || height <= 0
        || left as i64 + width as i64 > w
        || top as i64 + height as i64 > h
    {
        return Err(OpError::new("extract_area", "bad extract area"));
    }
    let b = img.bands() as usize;
    let (l, t, ow, oh) = (left as usize, top as usize, width as usize, height as usize);
    let mut out = alloc("extract_area", ow as u32, oh as u32, b as u32)?;
    let src_row = img.row_len();
    par_rows(&mut out, ow * b, |y, row| {
        let start = (t + y) * src_row + l * b;
        row.copy_from_slice(&img.pixels()[start..start + ow * b]);
    });
    VImage::from_samples(ow as u32, oh as u32, b as u32, img.interpretation(), out, img.meta().clone())
}

/// Fill value for one band of new canvas under [`Extend::Background`].
///
/// Missing vector elements beyond the first are filled with the full-scale
/// value, so an RGB background over an RGBA image comes out opaque.
fn background_ink(background: &[f64], bands: usize, interpretation: Interpretation) -> Vec<f32> {
    (0..bands)
        .map(|b| match background.len() {
            0 => 0.0,
            1 => background[0] as f32,
            n if b < n => background[b] as f32,
            _ => interpretation.max_value(),
        })
        .collect()
}

fn mirror(c: i64, n: i64) -> usize {
    let period = 2 * n;
    let m = c.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}

/// Places the image at (x, y) on a larger canvas filled per `extend`.
pub fn embed(
    img: &VImage,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    extend: Extend,
    background: &[f64],
) -> Status<VImage> {
    let params = Params::new()
        .int(x as i64)
        .int(y as i64)
        .int(width as i64)
        .int(height as i64)
        .int(extend as i64)
        .floats(background);
    call("embed", &[img], params, || {
        embed_kernel(img, x, y, width, height, extend, background)
    })
}

pub(crate) fn embed_kernel(
    img: &VImage,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    extend: Extend,
    background: &[f64],
) -> OpResult<VImage> {
    if width <= 0 || height <= 0 {
        return Err(OpError::new("embed", format!("bad dimensions {width}x{height}")));
    }
    let (w, h, b) = (img.width() as i64, img.height() as i64, img.bands() as usize);
    let (ow, oh) = (width as usize, height as usize);
    let mut out = alloc("embed", ow as u32, oh as u32, b as u32)?;
    let interpretation = img.interpretation();
    let fill: Vec<f32> = match extend {
        Extend::White => vec![interpretation.max_value(); b],
        Extend::Background => background_ink(background, b, interpretation),
        _ => vec![0.0; b],
    };

    par_rows(&mut out, ow * b, |oy, row| {
        let sy = oy as i64 - y as i64;
        for ox in 0..ow {
            let sx = ox as i64 - x as i64;
            let dst = &mut row[ox * b..(ox + 1) * b];
            if (0..w).contains(&sx) && (0..h).contains(&sy) {
                dst.copy_from_slice(img.pixel(sx as usize, sy as usize));
                continue;
            }
            match extend {
                Extend::Copy => {
                    dst.copy_from_slice(img.pixel(sx.clamp(0, w - 1) as usize, sy.clamp(0, h - 1) as usize))
                }
                Extend::Repeat => {
                    dst.copy_from_slice(img.pixel(sx.rem_euclid(w) as usize, sy.rem_euclid(h) as usize))
                }
                Extend::Mirror => dst.copy_from_slice(img.pixel(mirror(sx, w), mirror(sy, h))),
                Extend::Black | Extend::White | Extend::Background => dst.copy_from_slice(&fill),
            }
        }
    });
    VImage::from_samples(ow as u32, oh as u32, b as u32, interpretation, out, img.meta().clone())
}

/// Pastes `sub` onto `main` with its top-left corner at (x, y). The output
/// has the size of `main`; parts of `sub` outside it are dropped.
pub fn insert(main: &VImage, sub: &VImage, x: i32, y: i32) -> Status<VImage> {
    call("insert", &[main, sub], Params::new().int(x as i64).int(y as i64), || {
        let b = bandalike("insert", main.bands(), sub.bands())? as usize;
        let (w, h) = (main.width() as usize, main.height() as usize);
        let (sw, sh) = (sub.width() as i64, sub.height() as i64);
        let mut out = alloc("insert", w as u32, h as u32, b as u32)?;
        par_rows(&mut out, w * b, |oy, row| {
            let sy = oy as i64 - y as i64;
            for ox in 0..w {
                let sx = ox as i64 - x as i64;
                let px = if (0..sw).contains(&sx) && (0..sh).contains(&sy) {
                    sub.pixel(sx as usize, sy as usize)
                } else {
                    main.pixel(ox, oy)
                };
                for c in 0..b {
                    row[ox * b + c] = band(px, c);
                }
            }
        });
        let interpretation = if b as u32 == main.bands() {
            main.interpretation()
        } else {
            sub.interpretation()
        };
        VImage::from_samples(w as u32, h as u32, b as u32, interpretation, out, main.meta().clone())
    })
}

// =============================================================================
// Affine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Nearest,
    Bilinear,
    Cubic,
}

/// Resolves an interpolator name. `lbb`, `nohalo` and `vsqbs` share the
/// 4x4 cubic kernel.
fn lookup_interpolator(name: &str) -> OpResult<Kernel> {
    match name {
        "nearest" => Ok(Kernel::Nearest),
        "bilinear" => Ok(Kernel::Bilinear),
        "bicubic" | "lbb" | "nohalo" | "vsqbs" => Ok(Kernel::Cubic),
        _ => Err(OpError::new("interpolate", format!("no such interpolator \"{name}\""))),
    }
}

/// Source pixels read along each axis by the named interpolator, or `None`
/// for an unknown name.
pub fn interpolator_window_size(name: &str) -> Option<i32> {
    lookup_interpolator(name).ok().map(|k| match k {
        Kernel::Nearest => 1,
        Kernel::Bilinear => 2,
        Kernel::Cubic => 4,
    })
}

/// Catmull-Rom weights for fractional offset `t`.
fn cubic_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        -0.5 * t3 + t2 - 0.5 * t,
        1.5 * t3 - 2.5 * t2 + 1.0,
        -1.5 * t3 + 2.0 * t2 + 0.5 * t,
        0.5 * t3 - 0.5 * t2,
    ]
}

fn sample(img: &VImage, kernel: Kernel, sx: f32, sy: f32, out: &mut [f32]) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let at = move |x: i64, y: i64| img.pixel(x.clamp(0, w - 1) as usize, y.clamp(0, h - 1) as usize);
    match kernel {
        Kernel::Nearest => out.copy_from_slice(at(sx.round() as i64, sy.round() as i64)),
        Kernel::Bilinear => {
            let (x0, y0) = (sx.floor(), sy.floor());
            let (fx, fy) = (sx - x0, sy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let (p00, p10, p01, p11) = (at(x0, y0), at(x0 + 1, y0), at(x0, y0 + 1), at(x0 + 1, y0 + 1));
            for (c, o) in out.iter_mut().enumerate() {
                let top = p00[c] + (p10[c] - p00[c]) * fx;
                let bottom = p01[c] + (p11[c] - p01[c]) * fx;
                *o = top + (bottom - top) * fy;
            }
        }
        Kernel::Cubic => {
            let (x0, y0) = (sx.floor(), sy.floor());
            let (wx, wy) = (cubic_weights(sx - x0), cubic_weights(sy - y0));
            let (x0, y0) = (x0 as i64, y0 as i64);
            out.fill(0.0);
            for (j, wyj) in wy.iter().enumerate() {
                for (i, wxi) in wx.iter().enumerate() {
                    let px = at(x0 + i as i64 - 1, y0 + j as i64 - 1);
                    let weight = wxi * wyj;
                    for (c, o) in out.iter_mut().enumerate() {
                        *o += px[c] * weight;
                    }
                }
            }
        }
    }
}

/// Resamples through the 2x2 matrix `[a, b, c, d]`, mapping (x, y) to
/// (a*x + b*y, c*x + d*y). Area outside the source is black.
pub fn affine(img: &VImage, matrix: [f64; 4], interpolator: &str) -> Status<VImage> {
    let params = Params::new().floats(&matrix).text(interpolator);
    call("affine", &[img], params, || {
        let kernel = lookup_interpolator(interpolator)?;
        let [a, b, c, d] = matrix;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return Err(OpError::new("affine", "singular or near-singular matrix"));
        }
        let (w, h) = (img.width() as f64, img.height() as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| (a * x + b * y, c * x + d * y));
        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        let ow = dim("affine", ((max_x - min_x).round() as i64).max(1))?;
        let oh = dim("affine", ((max_y - min_y).round() as i64).max(1))?;
        let bands = img.bands() as usize;
        let mut out = alloc("affine", ow, oh, bands as u32)?;

        par_rows(&mut out, ow as usize * bands, |oy, row| {
            let gy = oy as f64 + min_y + 0.5;
            for ox in 0..ow as usize {
                let gx = ox as f64 + min_x + 0.5;
                let sx = (d * gx - b * gy) / det - 0.5;
                let sy = (-c * gx + a * gy) / det - 0.5;
                if sx < -0.5 || sy < -0.5 || sx > w - 0.5 || sy > h - 0.5 {
                    continue;
                }
                sample(img, kernel, sx as f32, sy as f32, &mut row[ox * bands..(ox + 1) * bands]);
            }
        });
        VImage::from_samples(ow, oh, bands as u32, img.interpretation(), out, img.meta().clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_buffer, thread_shutdown};
    use crate::ops::testutil::{engine, image_fn, solid};
    use approx::assert_relative_eq;

    fn ramp(w: u32, h: u32) -> VImage {
        image_fn(w, h, 1, Interpretation::Bw, |x, y, _| (y * w + x) as f32)
    }

    #[test]
    fn rotate_90_moves_corners() {
        engine();
        let img = ramp(3, 2);
        let r = rot(&img, Angle::D90).unwrap();
        assert_eq!((r.width(), r.height()), (2, 3));
        // bottom-left of the source becomes top-left
        assert_eq!(r.pixel(0, 0)[0], 3.0);
        let back = rot(&rot(&rot(&r, Angle::D90).unwrap(), Angle::D90).unwrap(), Angle::D90).unwrap();
        assert_eq!(back.pixels(), img.pixels());
    }

    #[test]
    fn flip_horizontal() {
        engine();
        let f = flip(&ramp(3, 1), Direction::Horizontal).unwrap();
        assert_eq!(f.pixels(), &[2.0, 1.0, 0.0]);
    }

    #[test]
    fn zoom_and_shrink() {
        engine();
        let img = ramp(2, 2);
        let z = zoom(&img, 2, 3).unwrap();
        assert_eq!((z.width(), z.height()), (4, 6));
        let s = shrink(&z, 2, 3).unwrap();
        assert_eq!(s.pixels(), img.pixels());
        assert!(zoom(&img, 0, 1).is_err());
        assert!(error_buffer().contains("zoom:"));
        thread_shutdown();
    }

    #[test]
    fn shrink_averages() {
        engine();
        let img = ramp(2, 1);
        let s = shrink(&img, 2, 1).unwrap();
        assert_relative_eq!(s.pixels()[0], 0.5);
    }

    #[test]
    fn extract_rejects_outside() {
        engine();
        let img = ramp(4, 4);
        let e = extract_area(&img, 1, 1, 2, 2).unwrap();
        assert_eq!(e.pixels(), &[5.0, 6.0, 9.0, 10.0]);
        assert!(extract_area(&img, 3, 3, 2, 2).is_err());
        assert!(error_buffer().contains("extract_area: bad extract area"));
        thread_shutdown();
    }

    #[test]
    fn embed_modes() {
        engine();
        let img = ramp(2, 1);
        let black = embed(&img, 1, 0, 4, 1, Extend::Black, &[]).unwrap();
        assert_eq!(black.pixels(), &[0.0, 0.0, 1.0, 0.0]);
        let copy = embed(&img, 1, 0, 4, 1, Extend::Copy, &[]).unwrap();
        assert_eq!(copy.pixels(), &[0.0, 0.0, 1.0, 1.0]);
        let repeat = embed(&img, 1, 0, 4, 1, Extend::Repeat, &[]).unwrap();
        assert_eq!(repeat.pixels(), &[1.0, 0.0, 1.0, 0.0]);
        let mirrored = embed(&img, 2, 0, 6, 1, Extend::Mirror, &[]).unwrap();
        assert_eq!(mirrored.pixels(), &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        let white = embed(&img, 0, 0, 3, 1, Extend::White, &[]).unwrap();
        assert_eq!(white.pixels()[2], 255.0);
        let bg = embed(&img, 0, 0, 3, 1, Extend::Background, &[7.0]).unwrap();
        assert_eq!(bg.pixels()[2], 7.0);
    }

    #[test]
    fn background_pads_alpha_opaque() {
        let ink = background_ink(&[10.0, 20.0, 30.0], 4, Interpretation::Srgb);
        assert_eq!(ink, vec![10.0, 20.0, 30.0, 255.0]);
    }

    #[test]
    fn insert_clips_sub() {
        engine();
        let main = solid(3, 3, &[1.0], Interpretation::Bw);
        let sub = solid(2, 2, &[9.0], Interpretation::Bw);
        let out = insert(&main, &sub, 2, 2).unwrap();
        assert_eq!((out.width(), out.height()), (3, 3));
        assert_eq!(out.pixel(2, 2)[0], 9.0);
        assert_eq!(out.pixel(1, 1)[0], 1.0);
    }

    #[test]
    fn insert_broadcasts_single_band() {
        engine();
        let main = solid(2, 2, &[1.0, 2.0, 3.0], Interpretation::Srgb);
        let sub = solid(1, 1, &[9.0], Interpretation::Bw);
        let out = insert(&main, &sub, 0, 0).unwrap();
        assert_eq!(out.bands(), 3);
        assert_eq!(out.pixel(0, 0), &[9.0, 9.0, 9.0]);
        let bad = solid(1, 1, &[1.0, 2.0], Interpretation::Multiband);
        assert!(insert(&main, &bad, 0, 0).is_err());
        thread_shutdown();
    }

    #[test]
    fn affine_identity_and_scale() {
        engine();
        let img = ramp(4, 4);
        let same = affine(&img, [1.0, 0.0, 0.0, 1.0], "bilinear").unwrap();
        assert_eq!((same.width(), same.height()), (4, 4));
        for (a, b) in same.pixels().iter().zip(img.pixels()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
        let big = affine(&img, [2.0, 0.0, 0.0, 2.0], "nohalo").unwrap();
        assert_eq!((big.width(), big.height()), (8, 8));
    }

    #[test]
    fn affine_unknown_interpolator() {
        engine();
        assert!(affine(&ramp(2, 2), [1.0, 0.0, 0.0, 1.0], "sinc-ish").is_err());
        assert!(error_buffer().contains("no such interpolator"));
        thread_shutdown();
    }

    #[test]
    fn window_sizes() {
        assert_eq!(interpolator_window_size("nearest"), Some(1));
        assert_eq!(interpolator_window_size("bilinear"), Some(2));
        assert_eq!(interpolator_window_size("vsqbs"), Some(4));
        assert_eq!(interpolator_window_size("nope"), None);
    }

    #[test]
    fn replicate_tiles() {
        engine();
        let r = replicate(&ramp(2, 1), 2, 2).unwrap();
        assert_eq!(r.pixels(), &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }
}
