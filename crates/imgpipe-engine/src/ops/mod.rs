//! Pixel operations.
//!
//! Every public function here takes its inputs by reference, leaves them
//! untouched, and returns a new node. Failures land in the calling thread's
//! error buffer.

pub mod arithmetic;
pub mod colour;
pub mod convolution;
pub mod create;
pub mod geometry;
pub mod text;
pub mod watermark;

use rayon::prelude::*;

use crate::error::{OpError, OpResult};

/// Fills `data` row by row in parallel. `f` gets the row index and the row.
pub(crate) fn par_rows<F>(data: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    if row_len == 0 {
        return;
    }
    data.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Band `b` of a pixel, broadcasting single-band pixels.
#[inline]
pub(crate) fn band(px: &[f32], b: usize) -> f32 {
    if px.len() == 1 { px[0] } else { px[b] }
}

/// Element `b` of a constant vector, broadcasting single-element vectors.
#[inline]
pub(crate) fn element(v: &[f64], b: usize) -> f64 {
    if v.len() == 1 { v[0] } else { v[b] }
}

/// Checks that a constant vector matches a band count.
pub(crate) fn check_vector(domain: &'static str, v: &[f64], bands: u32) -> OpResult<()> {
    if v.len() == 1 || v.len() == bands as usize {
        Ok(())
    } else {
        Err(OpError::new(
            domain,
            format!("vector must have 1 or {bands} elements, not {}", v.len()),
        ))
    }
}

/// Output band count when two images are combined band by band.
pub(crate) fn bandalike(domain: &'static str, a: u32, b: u32) -> OpResult<u32> {
    if a == b || b == 1 {
        Ok(a)
    } else if a == 1 {
        Ok(b)
    } else {
        Err(OpError::new(
            domain,
            format!("images must have the same number of bands, or one must be single-band ({a} vs {b})"),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use imgpipe_core::Interpretation;

    use crate::image::{Meta, VImage};

    /// Starts the engine for unit tests. Idempotent.
    pub fn engine() {
        crate::runtime::init("imgpipe-engine-tests").unwrap();
    }

    /// Image whose samples are given by `f(x, y, band)`.
    pub fn image_fn(
        w: u32,
        h: u32,
        bands: u32,
        interpretation: Interpretation,
        f: impl Fn(u32, u32, u32) -> f32,
    ) -> VImage {
        let mut data = Vec::with_capacity((w * h * bands) as usize);
        for y in 0..h {
            for x in 0..w {
                for b in 0..bands {
                    data.push(f(x, y, b));
                }
            }
        }
        VImage::from_samples(w, h, bands, interpretation, data, Meta::default()).unwrap()
    }

    /// Constant image.
    pub fn solid(w: u32, h: u32, values: &[f32], interpretation: Interpretation) -> VImage {
        image_fn(w, h, values.len() as u32, interpretation, |_, _, b| values[b as usize])
    }
}
