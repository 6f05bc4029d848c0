//! Gaussian blur and unsharp-mask sharpening.

use crate::error::{OpError, OpResult, Status};
use crate::image::VImage;
use crate::operation::{call, Params};

use super::par_rows;

/// Largest kernel half-width a blur or sharpen will build.
pub(crate) const MAX_KERNEL_RADIUS: i64 = 10_000;

/// Sampled, normalized 1D gaussian truncated where it falls below `min_ampl`.
pub(crate) fn gaussian_kernel(domain: &'static str, sigma: f64, min_ampl: f64) -> OpResult<Vec<f32>> {
    let radius = (sigma * (-2.0 * min_ampl.ln()).sqrt()).floor().max(0.0);
    if !(radius <= MAX_KERNEL_RADIUS as f64) {
        return Err(OpError::new(domain, format!("kernel too large for sigma {sigma}")));
    }
    let radius = radius as i64;
    let sigma2 = 2.0 * sigma * sigma;
    let mut data: Vec<f32> = (-radius..=radius)
        .map(|x| {
            let x = x as f64;
            (-(x * x) / sigma2).exp() as f32
        })
        .collect();
    let sum: f32 = data.iter().sum();
    for w in &mut data {
        *w /= sum;
    }
    Ok(data)
}

/// Separable convolution with clamp-to-edge.
fn convolve_separable(img: &VImage, kernel: &[f32]) -> Vec<f32> {
    let (w, h, b) = (img.width() as usize, img.height() as usize, img.bands() as usize);
    let half = (kernel.len() / 2) as i64;
    let src = img.pixels();

    let mut tmp = vec![0.0f32; w * h * b];
    par_rows(&mut tmp, w * b, |y, row| {
        for x in 0..w {
            for c in 0..b {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x as i64 + k as i64 - half).clamp(0, w as i64 - 1) as usize;
                    acc += src[(y * w + sx) * b + c] * weight;
                }
                row[x * b + c] = acc;
            }
        }
    });

    let mut out = vec![0.0f32; w * h * b];
    par_rows(&mut out, w * b, |y, row| {
        for x in 0..w {
            for c in 0..b {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y as i64 + k as i64 - half).clamp(0, h as i64 - 1) as usize;
                    acc += tmp[(sy * w + x) * b + c] * weight;
                }
                row[x * b + c] = acc;
            }
        }
    });
    out
}

/// Gaussian blur. A sigma of zero returns the image unchanged.
pub fn gaussblur(img: &VImage, sigma: f64, min_ampl: f64) -> Status<VImage> {
    call("gaussblur", &[img], Params::new().float(sigma).float(min_ampl), || {
        if !(sigma >= 0.0) {
            return Err(OpError::new("gaussblur", format!("sigma must be >= 0, got {sigma}")));
        }
        if !(min_ampl > 0.0 && min_ampl < 1.0) {
            return Err(OpError::new("gaussblur", format!("min_ampl must be in (0, 1), got {min_ampl}")));
        }
        if sigma == 0.0 {
            return Ok(img.copy());
        }
        let kernel = gaussian_kernel("gaussblur", sigma, min_ampl)?;
        let out = convolve_separable(img, &kernel);
        VImage::from_samples(img.width(), img.height(), img.bands(), img.interpretation(), out, img.meta().clone())
    })
}

/// Unsharp-mask tone curve applied to a difference `d` on a 0..100 scale.
pub(crate) fn sharpen_curve(d: f64, x1: f64, y2: f64, y3: f64, m1: f64, m2: f64) -> f64 {
    let magnitude = d.abs();
    let boost = if magnitude < x1 {
        magnitude * m1
    } else {
        x1 * m1 + (magnitude - x1) * m2
    };
    if d >= 0.0 { boost.min(y2) } else { -boost.min(y3) }
}

/// Sharpens colour bands through an unsharp mask with a piecewise-linear
/// response. Alpha is left alone.
pub fn sharpen(img: &VImage, sigma: f64, x1: f64, y2: f64, y3: f64, m1: f64, m2: f64) -> Status<VImage> {
    let params = Params::new().floats(&[sigma, x1, y2, y3, m1, m2]);
    call("sharpen", &[img], params, || {
        if !(sigma > 0.0) {
            return Err(OpError::new("sharpen", format!("sigma must be > 0, got {sigma}")));
        }
        if [x1, y2, y3, m1, m2].iter().any(|v| !(*v >= 0.0)) {
            return Err(OpError::new("sharpen", "parameter out of range"));
        }
        sharpen_kernel(img, sigma, [x1, y2, y3, m1, m2])
    })
}

fn sharpen_kernel(img: &VImage, sigma: f64, curve: [f64; 5]) -> OpResult<VImage> {
    let [x1, y2, y3, m1, m2] = curve;
    let interpretation = img.interpretation();
    let max = interpretation.max_value() as f64;
    let scale = 100.0 / max;
    let bands = img.bands() as usize;
    let colour = if img.has_alpha() { bands - 1 } else { bands };

    let blurred = convolve_separable(img, &gaussian_kernel("sharpen", sigma, 0.2)?);
    let mut out = img.pixels().to_vec();
    par_rows(&mut out, img.row_len(), |y, row| {
        let base = y * row.len();
        for (i, v) in row.iter_mut().enumerate() {
            if i % bands >= colour {
                continue;
            }
            let d = (*v as f64 - blurred[base + i] as f64) * scale;
            let adjusted = *v as f64 + sharpen_curve(d, x1, y2, y3, m1, m2) / scale;
            *v = adjusted.clamp(0.0, max) as f32;
        }
    });
    VImage::from_samples(img.width(), img.height(), img.bands(), interpretation, out, img.meta().clone())
}
