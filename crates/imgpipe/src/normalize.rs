//! Pre-save normalization.
//!
//! Runs once per encode, right before the encoder:
//!
//! 1. strip the ICC profile when [`SaveOptions::strip_profile`] is set;
//! 2. convert to the target interpretation (sRGB unless given) when the
//!    image's colour space is convertible, otherwise pass it through;
//! 3. flatten alpha onto the background (white unless given).
//!
//! Every step consumes the handle it replaces.

use imgpipe_core::{Result, SaveOptions};
use tracing::debug;

use crate::handle::ImageHandle;
use crate::ops;

/// Prepares `handle` for encoding with `opts`.
pub fn pre_save_normalize(handle: ImageHandle, opts: &SaveOptions) -> Result<ImageHandle> {
    let mut handle = handle;

    if opts.strip_profile && handle.has_profile() {
        handle = ops::remove_profile(handle)?;
    }

    let target = opts.target_interpretation();
    if handle.interpretation() != target {
        if handle.is_colourspace_supported() {
            handle = ops::colourspace(handle, target)?;
        } else {
            debug!(from = %handle.interpretation(), to = %target, "colour space not convertible, kept");
        }
    }

    if handle.has_alpha() {
        handle = ops::flatten(handle, opts.flatten_background())?;
    }
    Ok(handle)
}
