//! Image constructors.

use imgpipe_core::Interpretation;

use crate::error::{OpError, OpResult, Status};
use crate::image::{check_size, Meta, VImage};
use crate::operation::call_uncached;

/// A zero-filled image. One band is [`Interpretation::Bw`], more are
/// [`Interpretation::Multiband`].
pub fn black(width: i32, height: i32, bands: i32) -> Status<VImage> {
    call_uncached("black", || black_kernel(width, height, bands))
}

pub(crate) fn black_kernel(width: i32, height: i32, bands: i32) -> OpResult<VImage> {
    if width < 1 || height < 1 || bands < 1 {
        return Err(OpError::new(
            "black",
            format!("bad dimensions {width}x{height}x{bands}"),
        ));
    }
    let (w, h, b) = (width as u32, height as u32, bands as u32);
    check_size("black", w, h, b)?;
    let interpretation = if b == 1 {
        Interpretation::Bw
    } else {
        Interpretation::Multiband
    };
    let data = vec![0.0f32; w as usize * h as usize * b as usize];
    VImage::from_samples(w, h, b, interpretation, data, Meta::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_buffer, thread_shutdown};
    use crate::ops::testutil::engine;

    #[test]
    fn black_interpretation() {
        engine();
        let one = black(4, 3, 1).unwrap();
        assert_eq!(one.interpretation(), Interpretation::Bw);
        assert!(one.pixels().iter().all(|v| *v == 0.0));
        let three = black(4, 3, 3).unwrap();
        assert_eq!(three.interpretation(), Interpretation::Multiband);
        assert_eq!(three.pixels().len(), 36);
    }

    #[test]
    fn black_rejects_empty() {
        engine();
        assert!(black(0, 3, 1).is_err());
        assert!(error_buffer().contains("black: bad dimensions"));
        thread_shutdown();
    }
}
